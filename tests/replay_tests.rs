use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

#[test]
fn test_full_marketplace_flow() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"event":"account","label":"alice","email":"alice@example.com"}}"#).unwrap();
    writeln!(file, r#"{{"event":"activation","account":"alice","phone":"254700000001"}}"#).unwrap();
    writeln!(
        file,
        r#"{{"event":"account","label":"bob","email":"bob@example.com","referred_by":"alice"}}"#
    )
    .unwrap();
    writeln!(file, r#"{{"event":"activation","account":"bob","phone":"254700000002"}}"#).unwrap();
    writeln!(
        file,
        r#"{{"event":"post_job","label":"job1","client":"alice","budget":2000}}"#
    )
    .unwrap();
    writeln!(
        file,
        r#"{{"event":"apply","label":"app1","job":"job1","freelancer":"bob"}}"#
    )
    .unwrap();
    writeln!(file, r#"{{"event":"accept","application":"app1","actor":"alice"}}"#).unwrap();
    writeln!(
        file,
        r#"{{"event":"milestone","label":"m1","job":"job1","actor":"alice","title":"Design","amount":500}}"#
    )
    .unwrap();
    writeln!(
        file,
        r#"{{"event":"complete_milestone","milestone":"m1","actor":"alice"}}"#
    )
    .unwrap();
    writeln!(
        file,
        r#"{{"event":"withdraw","account":"bob","wallet":"earnings","amount":200,"decision":"approve"}}"#
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("kazi"));
    cmd.arg(file.path());

    // Bob activated after Alice, so Alice earns the referral bonus; the
    // milestone pays 500 and the approved withdrawal takes 200 back out.
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "account,earnings,referral,total_earnings,activated",
        ))
        .stdout(predicate::str::contains("alice,0,50,0,true"))
        .stdout(predicate::str::contains("bob,300,0,500,true"));
}

#[test]
fn test_failed_activation_earns_no_bonus() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"event":"account","label":"alice","email":"alice@example.com"}}"#).unwrap();
    writeln!(file, r#"{{"event":"activation","account":"alice","phone":"254700000001"}}"#).unwrap();
    writeln!(
        file,
        r#"{{"event":"account","label":"bob","email":"bob@example.com","referred_by":"alice"}}"#
    )
    .unwrap();
    writeln!(
        file,
        r#"{{"event":"activation","account":"bob","phone":"254700000002","success":false}}"#
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("kazi"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("alice,0,0,0,true"))
        .stdout(predicate::str::contains("bob,0,0,0,false"));
}

#[test]
fn test_bad_lines_are_reported_and_skipped() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"event":"account","label":"alice","email":"alice@example.com"}}"#).unwrap();
    writeln!(file, "not json at all").unwrap();
    writeln!(file).unwrap();
    // Unknown label: the event fails but the replay keeps going.
    writeln!(file, r#"{{"event":"activation","account":"ghost","phone":"254700000009"}}"#).unwrap();
    writeln!(file, r#"{{"event":"activation","account":"alice","phone":"254700000001"}}"#).unwrap();

    let mut cmd = Command::new(cargo_bin!("kazi"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("alice,0,0,0,true"))
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_rejected_withdrawal_keeps_the_balance() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"event":"account","label":"alice","email":"alice@example.com"}}"#).unwrap();
    writeln!(file, r#"{{"event":"account","label":"bob","email":"bob@example.com"}}"#).unwrap();
    writeln!(file, r#"{{"event":"activation","account":"alice","phone":"254700000001"}}"#).unwrap();
    writeln!(file, r#"{{"event":"activation","account":"bob","phone":"254700000002"}}"#).unwrap();
    writeln!(
        file,
        r#"{{"event":"post_job","label":"job1","client":"alice","budget":1000}}"#
    )
    .unwrap();
    writeln!(
        file,
        r#"{{"event":"apply","label":"app1","job":"job1","freelancer":"bob"}}"#
    )
    .unwrap();
    writeln!(file, r#"{{"event":"accept","application":"app1","actor":"alice"}}"#).unwrap();
    writeln!(
        file,
        r#"{{"event":"complete_job","job":"job1","actor":"alice","final_amount":1000}}"#
    )
    .unwrap();
    writeln!(
        file,
        r#"{{"event":"withdraw","account":"bob","wallet":"earnings","amount":400,"decision":"reject"}}"#
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("kazi"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("bob,1000,0,1000,true"));
}

#[test]
fn test_custom_config_changes_the_bonus() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, r#"{{"referral_bonus": "75"}}"#).unwrap();

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"event":"account","label":"alice","email":"alice@example.com"}}"#).unwrap();
    writeln!(file, r#"{{"event":"activation","account":"alice","phone":"254700000001"}}"#).unwrap();
    writeln!(
        file,
        r#"{{"event":"account","label":"bob","email":"bob@example.com","referred_by":"alice"}}"#
    )
    .unwrap();
    writeln!(file, r#"{{"event":"activation","account":"bob","phone":"254700000002"}}"#).unwrap();

    let mut cmd = Command::new(cargo_bin!("kazi"));
    cmd.arg(file.path()).arg("--config").arg(config.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("alice,0,75,0,true"));
}
