use ferry_engine::{Realm, Value};
use ferry_provider_platform::{Directory, PlatformModule};
use ferry_runtime::HostObjectBuilder;

fn setup() -> (Realm, Value, PlatformModule) {
    let mut realm = Realm::new();
    let module = PlatformModule::new();
    let object = HostObjectBuilder::<Realm>::for_module(&module)
        .build()
        .unwrap();
    let host = realm.install(object);
    (realm, host, module)
}

#[test]
fn builds_without_async_collaborators() {
    let (realm, _, _) = setup();
    assert_eq!(realm.global_names().collect::<Vec<_>>(), vec!["platform"]);
}

#[test]
fn every_directory_is_a_string_property() {
    let (mut realm, host, _) = setup();
    for dir in Directory::ALL {
        let value = realm.get_member(&host, dir.property_name()).unwrap();
        assert!(value.as_str().is_some(), "{} is not a string", dir.property_name());
    }
    assert_eq!(
        realm.get_member(&host, "platform").unwrap().as_str(),
        Some(std::env::consts::OS)
    );
}

#[test]
fn get_directories_matches_the_properties() {
    let (mut realm, host, module) = setup();
    let all = realm.call_method(&host, "getDirectories", &[]).unwrap();
    for dir in Directory::ALL {
        assert_eq!(
            all.get(dir.property_name()).unwrap().as_str(),
            Some(module.dirs().get(dir))
        );
    }
}

#[test]
fn directory_properties_are_read_only() {
    let (mut realm, host, _) = setup();
    let before = realm.get_member(&host, "tempDir").unwrap();
    realm
        .set_member(&host, "tempDir", Value::string("/elsewhere"))
        .unwrap();
    assert_eq!(realm.get_member(&host, "tempDir").unwrap(), before);
}

#[test]
fn listed_members_cover_methods_then_properties() {
    let (_, host, _) = setup();
    let Value::Host(object) = host else {
        panic!("expected host object");
    };
    let names = object.member_names();
    assert_eq!(names.first().map(String::as_str), Some("getDirectories"));
    assert_eq!(names.len(), Directory::ALL.len() + 2);
}
