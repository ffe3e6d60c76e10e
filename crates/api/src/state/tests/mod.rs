// Path: crates/api/src/state/tests/mod.rs
use crate::state::{ClientStore, MemoryStore, StateAccess, StateOverlay, SubstituteStore};
use ioi_lc_types::error::StateError;
use ioi_lc_types::ibc::ClientId;
use std::str::FromStr;

fn id(s: &str) -> ClientId {
    ClientId::from_str(s).unwrap()
}

fn scan(store: &dyn StateAccess, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    store
        .prefix_scan(prefix)
        .unwrap()
        .map(|r| r.map(|(k, v)| (k.to_vec(), v.to_vec())).unwrap())
        .collect()
}

#[test]
fn overlay_buffers_until_drained() {
    let mut base = MemoryStore::new();
    base.insert(b"a", b"1").unwrap();
    base.insert(b"b", b"2").unwrap();

    let mut overlay = StateOverlay::new(&base);
    overlay.insert(b"c", b"3").unwrap();
    overlay.delete(b"a").unwrap();
    assert_eq!(overlay.get(b"a").unwrap(), None);
    assert_eq!(overlay.get(b"b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(base.get(b"a").unwrap(), Some(b"1".to_vec()));

    let (inserts, deletes) = overlay.into_ordered_batch();
    base.batch_apply(&inserts, &deletes).unwrap();
    assert_eq!(base.get(b"a").unwrap(), None);
    assert_eq!(base.get(b"c").unwrap(), Some(b"3".to_vec()));
}

#[test]
fn overlay_scan_merges_in_key_order() {
    let mut base = MemoryStore::new();
    for (k, v) in [(b"p/1", b"base"), (b"p/3", b"base"), (b"p/5", b"base")] {
        base.insert(k, v).unwrap();
    }
    base.insert(b"q/1", b"other").unwrap();

    let mut overlay = StateOverlay::new(&base);
    overlay.insert(b"p/2", b"new").unwrap();
    overlay.insert(b"p/3", b"shadow").unwrap();
    overlay.delete(b"p/5").unwrap();

    let got = scan(&overlay, b"p/");
    assert_eq!(
        got,
        vec![
            (b"p/1".to_vec(), b"base".to_vec()),
            (b"p/2".to_vec(), b"new".to_vec()),
            (b"p/3".to_vec(), b"shadow".to_vec()),
        ]
    );
}

#[test]
fn client_stores_do_not_observe_each_other() {
    let mut base = MemoryStore::new();
    let a = id("08-wasm-1");
    let b = id("08-wasm-10");

    ClientStore::new(&mut base, &a).insert(b"clientState", b"A").unwrap();
    ClientStore::new(&mut base, &b).insert(b"clientState", b"B").unwrap();

    let store_a = ClientStore::read_only(&base, &a);
    assert_eq!(store_a.get(b"clientState").unwrap(), Some(b"A".to_vec()));
    assert_eq!(scan(&store_a, b""), vec![(b"clientState".to_vec(), b"A".to_vec())]);

    let store_b = ClientStore::read_only(&base, &b);
    assert_eq!(store_b.get(b"clientState").unwrap(), Some(b"B".to_vec()));
}

#[test]
fn module_handle_cannot_write_host_records() {
    let mut base = MemoryStore::new();
    let client = id("08-wasm-0");
    {
        let mut host = ClientStore::host(&mut base, &client);
        host.insert(b"host/checksum", b"c1").unwrap();
    }
    let mut module = ClientStore::new(&mut base, &client);
    assert_eq!(module.get(b"host/checksum").unwrap(), Some(b"c1".to_vec()));
    let err = module.insert(b"host/checksum", b"forged").unwrap_err();
    assert!(matches!(err, StateError::PermissionDenied(_)));
    let err = module
        .batch_apply(&[(b"ok".to_vec(), b"1".to_vec())], &[b"host/checksum".to_vec()])
        .unwrap_err();
    assert!(matches!(err, StateError::PermissionDenied(_)));
    assert_eq!(module.get(b"ok").unwrap(), None);
}

#[test]
fn read_only_handle_denies_writes() {
    let base = MemoryStore::new();
    let mut store = ClientStore::read_only(&base, &id("08-wasm-0"));
    assert!(store.insert(b"k", b"v").is_err());
    assert!(store.delete(b"k").is_err());
}

#[test]
fn substitute_store_routes_and_protects_substitute() {
    let mut base = MemoryStore::new();
    let subject = id("08-wasm-0");
    let substitute = id("08-wasm-1");
    ClientStore::new(&mut base, &substitute)
        .insert(b"consensusStates/0-9", b"sub-cs")
        .unwrap();

    let mut wrapped = SubstituteStore::new(&mut base, &subject, &substitute);
    assert_eq!(
        wrapped.get(b"substitute/consensusStates/0-9").unwrap(),
        Some(b"sub-cs".to_vec())
    );
    wrapped.insert(b"subject/consensusStates/0-9", b"copied").unwrap();
    assert!(wrapped.insert(b"substitute/clientState", b"x").is_err());
    assert!(wrapped.insert(b"subject/host/checksum", b"x").is_err());
    assert!(wrapped.get(b"clientState").is_err());
    assert_eq!(
        scan(&wrapped, b"substitute/"),
        vec![(b"substitute/consensusStates/0-9".to_vec(), b"sub-cs".to_vec())]
    );

    let subject_view = ClientStore::read_only(&base, &subject);
    assert_eq!(
        subject_view.get(b"consensusStates/0-9").unwrap(),
        Some(b"copied".to_vec())
    );
}
