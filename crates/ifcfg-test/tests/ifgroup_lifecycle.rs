//! Interface group lifecycle tests

use ifcfg_common::{field_values, FieldValuesExt};
use ifcfg_ifgroup::IFGROUP_COLLECTION;
use ifcfg_model::{MutationResult, MutationStatus};
use ifcfg_test::{ConfigFixture, DocumentVerifier, MockReply, TestEnv};
use pretty_assertions::assert_eq;

fn env() -> TestEnv {
    let document = ConfigFixture::new()
        .with_interface("wan", "em1")
        .with_interface("lan", "em0")
        .with_interface("opt1", "em0_vlan10")
        .with_vlan("vlan-10", "em0", 10)
        .with_ifgroup("grp-inside", "inside", &["lan", "opt1"])
        .build();
    TestEnv::start(document).expect("Failed to start test env")
}

#[test]
fn test_add_validates_members_and_name() {
    let env = env();

    let result = env
        .groups
        .add_item(&field_values! { "ifname" => "dmz9", "members" => "opt7" })
        .unwrap();
    let validations = result.validations.unwrap();
    assert!(validations.contains_key("ifgroup.ifname"));
    assert_eq!(
        validations.get("ifgroup.members").map(String::as_str),
        Some("Unknown interface: opt7.")
    );

    let result = env
        .groups
        .add_item(&field_values! { "ifname" => "inside" })
        .unwrap();
    assert_eq!(result.result, MutationStatus::Failed);

    let result = env
        .groups
        .add_item(&field_values! { "ifname" => "outside", "members" => "wan" })
        .unwrap();
    assert_eq!(result.result, MutationStatus::Saved);
    DocumentVerifier::new(&env.reload().unwrap())
        .assert_record_count(IFGROUP_COLLECTION, 2)
        .unwrap();
}

/// Scenario:
/// 1. Delete a group with two resolvable members
/// 2. Verify one `-group` command per member device, then record removal
#[tokio::test]
async fn test_delete_detaches_each_member() {
    let env = env();

    let result = env.groups.del_item("grp-inside").await.unwrap();
    assert_eq!(result, MutationResult::deleted());

    let verifier = env.backend.verifier();
    verifier.assert_command_count(2).unwrap();
    verifier
        .assert_command_executed("/sbin/ifconfig \"em0\" -group \"inside\"")
        .unwrap();
    verifier
        .assert_command_executed("/sbin/ifconfig \"em0_vlan10\" -group \"inside\"")
        .unwrap();

    DocumentVerifier::new(&env.reload().unwrap())
        .assert_record_absent(IFGROUP_COLLECTION, "grp-inside")
        .unwrap();
}

#[tokio::test]
async fn test_delete_proceeds_when_ifconfig_fails() {
    let env = env();
    env.backend.set_reply(MockReply::Fail {
        exit_code: 1,
        stderr: "ifconfig: SIOCDIFGROUP: Device not configured".to_string(),
    });

    let result = env.groups.del_item("grp-inside").await.unwrap();
    assert_eq!(result.result, MutationStatus::Deleted);
    assert!(env.snapshot().records(IFGROUP_COLLECTION).is_empty());
}

#[tokio::test]
async fn test_delete_unknown_group() {
    let env = env();
    let result = env.groups.del_item("grp-missing").await.unwrap();
    assert_eq!(result, MutationResult::failed());
    env.backend.verifier().assert_command_count(0).unwrap();
}

#[test]
fn test_set_keeps_members_and_member_vlan_stays_guarded() {
    let env = env();
    let result = env
        .groups
        .set_item("grp-inside", &field_values! { "descr" => "trusted" })
        .unwrap();
    assert_eq!(result.result, MutationStatus::Saved);

    let view = env.groups.get_item(Some("grp-inside")).unwrap();
    assert_eq!(view.fields.get_field("descr"), Some("trusted"));
    assert_eq!(view.fields.get_field("members"), Some("lan opt1"));

    // vlan-10 is assigned as opt1, so the VLAN controller still refuses it
    assert!(env.vlans.del_item("vlan-10").is_err());
}
