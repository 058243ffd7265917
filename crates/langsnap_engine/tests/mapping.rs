//! Identifier mapping properties.

use langsnap_codec::Value;
use langsnap_engine::{IdAllocation, IdMapper, TransferError};
use langsnap_testkit::{empty_store, shared_store, source_ids_strategy, USERS};
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    #[test]
    fn map_id_is_stable_within_a_run(sources in source_ids_strategy()) {
        let store = empty_store();
        let mut mapper = IdMapper::new("phrase", IdAllocation::Sequence { table: "phrase" });

        let first: Vec<Value> = sources.iter().map(|s| mapper.map_id(s, &store).unwrap()).collect();
        let second: Vec<Value> = sources.iter().map(|s| mapper.map_id(s, &store).unwrap()).collect();
        prop_assert_eq!(&first, &second);

        let distinct_sources: HashSet<&Value> = sources.iter().collect();
        let distinct_destinations: HashSet<&Value> = first.iter().collect();
        prop_assert_eq!(distinct_sources.len(), distinct_destinations.len());
        prop_assert_eq!(mapper.len(), distinct_sources.len());
    }

    #[test]
    fn uuid_mappings_are_stable(sources in source_ids_strategy()) {
        let store = empty_store();
        let mut mapper = IdMapper::new("tracking_event", IdAllocation::Uuid);
        for source in &sources {
            let once = mapper.map_id(source, &store).unwrap();
            prop_assert_eq!(mapper.map_reference(source, &store).unwrap(), once);
        }
    }
}

#[test]
fn must_exist_keys_map_to_themselves() {
    let store = shared_store();
    let mut mapper = IdMapper::new("user", IdAllocation::MustExist { table: "users" });

    let ana = Value::from(USERS[0]);
    assert_eq!(mapper.map_reference(&ana, &store).unwrap(), ana);
    assert_eq!(mapper.map_id(&ana, &store).unwrap(), ana);
    assert_eq!(mapper.map_reference(&Value::Null, &store).unwrap(), Value::Null);
    assert!(matches!(
        mapper.map_reference(&Value::from("user-zed"), &store),
        Err(TransferError::DanglingReference { .. })
    ));
}
