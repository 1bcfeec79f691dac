//! vault 会话的最小可运行测试

use std::fs;

use tempfile::tempdir;

use passvault::{Entry, VaultSession};

#[test]
fn create_add_save_reopen() {
    let temp = tempdir().expect("create temp dir");
    let path = temp.path().join("vault.crypt");

    let mut session = VaultSession::create(&path, "session-password").expect("create vault");
    assert!(path.exists());
    assert!(session.entries().is_empty());

    session
        .add(Entry::new("mail").with_user("alice").with_password("s3cret"))
        .expect("add entry");
    assert!(session.is_modified());
    session.save().expect("save vault");
    assert!(!session.is_modified());

    let reopened = VaultSession::open(&path, "session-password").expect("reopen vault");
    assert_eq!(reopened.titles(), vec!["mail"]);
    assert_eq!(
        reopened.get("mail").and_then(|e| e.password.as_deref()),
        Some("s3cret")
    );
}

#[test]
fn open_missing_vault_offers_creation() {
    let temp = tempdir().expect("create temp dir");
    let path = temp.path().join("missing.crypt");

    let err = VaultSession::open(&path, "whatever").err().expect("missing vault");
    assert!(err.is_not_found());

    VaultSession::create(&path, "whatever").expect("create after not found");
    VaultSession::open(&path, "whatever").expect("open created vault");
}

#[test]
fn open_with_wrong_passphrase_fails() {
    let temp = tempdir().expect("create temp dir");
    let path = temp.path().join("vault.crypt");

    let mut session = VaultSession::create(&path, "right-password").expect("create vault");
    session.add(Entry::new("bank")).expect("add entry");
    session.save().expect("save vault");

    let result = VaultSession::open(&path, "wrong-password");
    assert!(result.is_err(), "expected wrong passphrase to fail");
}

#[test]
fn save_as_rekeys_the_vault() {
    let temp = tempdir().expect("create temp dir");
    let old_path = temp.path().join("old.crypt");
    let new_path = temp.path().join("new.crypt");

    let mut session = VaultSession::create(&old_path, "old-pass").expect("create vault");
    session.add(Entry::new("router")).expect("add entry");
    session.save_as(&new_path, "new-pass").expect("save as");
    assert_eq!(session.path(), Some(new_path.as_path()));

    assert!(VaultSession::open(&new_path, "old-pass").is_err());
    let reopened = VaultSession::open(&new_path, "new-pass").expect("open re-keyed vault");
    assert_eq!(reopened.titles(), vec!["router"]);
}

#[test]
fn export_then_import() {
    let temp = tempdir().expect("create temp dir");
    let vault = temp.path().join("vault.crypt");
    let export = temp.path().join("export.xml");

    let mut session = VaultSession::create(&vault, "export-pass").expect("create vault");
    session
        .add(Entry::new("forum").with_notes("exported"))
        .expect("add entry");
    session.export(&export).expect("export");
    assert_eq!(&fs::read(&export).expect("read export")[..2], &[0x1f, 0x8b]);

    let mut other = VaultSession::new();
    other.import(&export).expect("import");
    assert!(other.is_modified());
    assert!(other.path().is_none());
    assert!(!other.has_key());
    assert_eq!(
        other.get("forum").and_then(|e| e.notes.as_deref()),
        Some("exported")
    );
}
