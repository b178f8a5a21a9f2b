//! `.env` loading and API key resolution.

use std::collections::BTreeMap;

use ghostline::credentials::{load_credentials, resolve_api_key, Credentials};

fn creds(pairs: &[(&str, &str)]) -> Credentials {
    Credentials::from_map(
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<BTreeMap<_, _>>(),
    )
}

#[test]
fn missing_file_is_empty() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let loaded = load_credentials(&dir.path().join(".env")).expect("missing file is not an error");
    assert!(loaded.get("GEMINI_API_KEY").is_none());
}

#[test]
fn env_file_values_are_loaded() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join(".env");
    std::fs::write(
        &path,
        "# comment\nGEMINI_API_KEY=from-file\nOTHER=\"quoted value\"\n",
    )
    .expect("should write .env");

    let loaded = load_credentials(&path).expect("should parse .env");
    assert_eq!(loaded.get("GEMINI_API_KEY"), Some("from-file"));
    assert_eq!(loaded.get("OTHER"), Some("quoted value"));
}

#[test]
fn process_env_wins_over_file() {
    let file = creds(&[("GEMINI_API_KEY", "from-file")]);
    let key = resolve_api_key("GEMINI_API_KEY", &file, |_| Some("from-env".to_owned()));
    assert_eq!(key.as_ref().map(|k| k.expose()), Some("from-env"));
}

#[test]
fn file_is_used_when_env_is_blank() {
    let file = creds(&[("GEMINI_API_KEY", "from-file")]);
    let key = resolve_api_key("GEMINI_API_KEY", &file, |_| Some("   ".to_owned()));
    assert_eq!(key.as_ref().map(|k| k.expose()), Some("from-file"));
}

#[test]
fn custom_variable_name_is_honoured() {
    let file = creds(&[("GEMINI_API_KEY", "wrong"), ("WORK_KEY", "right")]);
    let key = resolve_api_key("WORK_KEY", &file, |_| None);
    assert_eq!(key.as_ref().map(|k| k.expose()), Some("right"));
}

#[test]
fn no_key_anywhere_is_none() {
    assert!(resolve_api_key("GEMINI_API_KEY", &Credentials::default(), |_| None).is_none());
}

#[test]
fn debug_output_hides_values() {
    let rendered = format!("{:?}", creds(&[("GEMINI_API_KEY", "AIza-very-secret")]));
    assert!(rendered.contains("GEMINI_API_KEY"));
    assert!(!rendered.contains("very-secret"));
}
