pub fn resolve_profile(requested: &str) -> String {
    match requested.trim() {
        "" => "default".to_string(),
        trimmed => trimmed.to_string(),
    }
}
