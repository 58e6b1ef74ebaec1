use anatomy::config::{playbook_from_str, register_features_from_str};
use anatomy::error::Error;
use anatomy::feature::FeatureRegistry;
use std::fs;
use tempfile::TempDir;

const ALPHA_FEATURE: &str = r#"
anatomy-features:
  - name: ALPHA
    variables:
      name: Alpha
    commands:
      - command: create-file
        fileid: alphatxt
        filename: alpha.txt
        contents: "This is {{ ALPHA.name }}."
"#;

const DIAMOND_FEATURES: &str = r#"
anatomy-features:
  - name: ALPHA
    variables:
      name: Alpha
    commands:
      - command: create-file
        fileid: alphatxt
        filename: alpha.txt
        contents: "This is {{ ALPHA.name }}."
  - name: BRAVO
    use-features:
      ALPHA:
        name: Bravo
  - name: CHARLIE
    use-features:
      ALPHA:
        name: Charlie
  - name: ZULU
    use-features:
      BRAVO: {}
      CHARLIE: {}
  - name: YANKEE
    use-features:
      CHARLIE: {}
      BRAVO: {}
"#;

fn registry_from(features: &str) -> FeatureRegistry {
    let mut registry = FeatureRegistry::new();
    register_features_from_str(&mut registry, features).unwrap();
    registry
}

fn read(path: &std::path::Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_playbook_end_to_end() {
    let registry = registry_from(ALPHA_FEATURE);
    let playbook =
        playbook_from_str(&registry, "anatomy-playbook:\n  use-features:\n    ALPHA: {}\n")
            .unwrap();

    let temp_dir = TempDir::new().unwrap();
    playbook.apply(temp_dir.path()).unwrap();

    assert_eq!(read(&temp_dir.path().join("alpha.txt")), "This is Alpha.\n");
}

#[test]
fn test_playbook_keys_at_document_top_level() {
    let registry = registry_from(ALPHA_FEATURE);
    let playbook = playbook_from_str(&registry, "use-features:\n  ALPHA: {}\n").unwrap();

    let temp_dir = TempDir::new().unwrap();
    playbook.apply(temp_dir.path()).unwrap();

    assert_eq!(read(&temp_dir.path().join("alpha.txt")), "This is Alpha.\n");
}

#[test]
fn test_playbook_use_feature_overrides() {
    let registry = registry_from(ALPHA_FEATURE);
    let playbook = playbook_from_str(
        &registry,
        "anatomy-playbook:\n  use-features:\n    ALPHA:\n      name: Zulu\n",
    )
    .unwrap();

    let temp_dir = TempDir::new().unwrap();
    playbook.apply(temp_dir.path()).unwrap();

    assert_eq!(read(&temp_dir.path().join("alpha.txt")), "This is Zulu.\n");
}

#[test]
fn test_playbook_root_variables() {
    let registry = registry_from(
        r##"
anatomy-features:
  - name: README
    commands:
      - command: create-file
        fileid: readme
        filename: README.md
        contents: "# {{ PROJECT.name }}"
"##,
    );
    let playbook = playbook_from_str(
        &registry,
        "anatomy-playbook:\n  use-features:\n    README: {}\n  variables:\n    PROJECT:\n      name: Hello\n",
    )
    .unwrap();

    let temp_dir = TempDir::new().unwrap();
    playbook.apply(temp_dir.path()).unwrap();

    assert_eq!(read(&temp_dir.path().join("README.md")), "# Hello\n");
}

#[test]
fn test_diamond_dependency_last_listed_wins() {
    let registry = registry_from(DIAMOND_FEATURES);

    let playbook =
        playbook_from_str(&registry, "anatomy-playbook:\n  use-features:\n    ZULU: {}\n")
            .unwrap();
    let temp_dir = TempDir::new().unwrap();
    playbook.apply(temp_dir.path()).unwrap();
    assert_eq!(read(&temp_dir.path().join("alpha.txt")), "This is Charlie.\n");

    let playbook =
        playbook_from_str(&registry, "anatomy-playbook:\n  use-features:\n    YANKEE: {}\n")
            .unwrap();
    let temp_dir = TempDir::new().unwrap();
    playbook.apply(temp_dir.path()).unwrap();
    assert_eq!(read(&temp_dir.path().join("alpha.txt")), "This is Bravo.\n");
}

#[test]
fn test_use_features_must_be_a_mapping() {
    let registry = registry_from(ALPHA_FEATURE);
    let err = playbook_from_str(&registry, "anatomy-playbook:\n  use-features:\n    - ALPHA\n")
        .unwrap_err();
    assert!(matches!(err, Error::ConfigError(_)));
}

#[test]
fn test_unknown_feature_in_playbook() {
    let registry = registry_from(ALPHA_FEATURE);
    let err = playbook_from_str(&registry, "anatomy-playbook:\n  use-features:\n    OMEGA: {}\n")
        .unwrap_err();
    assert!(matches!(err, Error::FeatureNotFound { .. }));
}

#[test]
fn test_duplicate_root_variable_is_rejected() {
    let registry = registry_from(ALPHA_FEATURE);
    let err = playbook_from_str(
        &registry,
        "anatomy-playbook:\n  use-features:\n    ALPHA:\n      name: Zulu\n  variables:\n    ALPHA:\n      name: Zed\n",
    )
    .unwrap_err();
    assert!(matches!(err, Error::ConfigError(_)));
}

#[test]
fn test_apply_is_idempotent() {
    let registry = registry_from(DIAMOND_FEATURES);
    let playbook =
        playbook_from_str(&registry, "anatomy-playbook:\n  use-features:\n    ZULU: {}\n")
            .unwrap();

    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    playbook.apply(dir_a.path()).unwrap();
    playbook.apply(dir_b.path()).unwrap();
    // Re-applying over existing output must also converge.
    playbook.apply(dir_a.path()).unwrap();

    assert!(!dir_diff::is_different(dir_a.path(), dir_b.path()).unwrap());
}

#[test]
fn test_add_variables_command_concatenates_sequences() {
    let registry = registry_from(
        r#"
anatomy-features:
  - name: ALPHA
    variables:
      blocks:
        - one
    commands:
      - command: create-file
        fileid: listtxt
        filename: list.txt
        contents: |
          {% for block in ALPHA.blocks %}
          {{ block }}
          {% endfor %}
  - name: BRAVO
    use-features:
      ALPHA: {}
    commands:
      - command: add-variables
        variables:
          ALPHA:
            blocks:
              - two
"#,
    );
    let playbook =
        playbook_from_str(&registry, "anatomy-playbook:\n  use-features:\n    BRAVO: {}\n")
            .unwrap();

    let temp_dir = TempDir::new().unwrap();
    playbook.apply(temp_dir.path()).unwrap();

    assert_eq!(read(&temp_dir.path().join("list.txt")), "one\ntwo\n");
}

#[test]
fn test_create_link_through_playbook() {
    let registry = registry_from(
        r##"
anatomy-features:
  - name: SCRIPTS
    commands:
      - command: create-file
        fileid: runsh
        filename: run.sh
        contents: "#!/bin/sh"
        executable: true
      - command: create-link
        filename: start.sh
        symlink: run.sh
"##,
    );
    let playbook =
        playbook_from_str(&registry, "anatomy-playbook:\n  use-features:\n    SCRIPTS: {}\n")
            .unwrap();

    let temp_dir = TempDir::new().unwrap();
    playbook.apply(temp_dir.path()).unwrap();

    let link = temp_dir.path().join("start.sh");
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(read(&link), "#!/bin/sh\n");
}
