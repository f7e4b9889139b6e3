fn main() {
    // Keys read through option_env!.
    for key in ["GEMINI_API_KEY", "FIREBASE_API_KEY"] {
        println!("cargo:rerun-if-env-changed={}", key);
    }
}
