use crate::history::HistoryStore;
use crate::providers::ModelClient;
use crate::settings::Settings;
use crate::translator::Translator;

pub(crate) struct ServerState<M: ModelClient, S: HistoryStore> {
    pub(crate) settings: Settings,
    pub(crate) translator: Translator<M>,
    pub(crate) history: S,
}
