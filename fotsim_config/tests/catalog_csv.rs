use fotsim_config::load_catalog_csv;
use std::path::PathBuf;

fn write_csv(content: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.csv");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn well_formed_catalog_loads() {
    let (_dir, path) = write_csv(
        "id,kind,label,connector,fiber_length_m\n\
         coil-1,FIBER_COIL,Fiber coil 1 km,SC_APC,1000\n\
         patch-2,OPTICAL_CABLE,Patch cord 3 m,SC_UPC,3\n",
    );
    let rows = load_catalog_csv(&path).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, "coil-1");
    assert_eq!(rows[0].fiber_length_m, 1000.0);
    assert_eq!(rows[1].kind, "OPTICAL_CABLE");
}

#[test]
fn wrong_headers_fail_loudly() {
    let (_dir, path) = write_csv(
        "id,type,label,connector,length\n\
         coil-1,FIBER_COIL,Fiber coil,SC_APC,1000\n",
    );
    let err = load_catalog_csv(&path).unwrap_err().to_string();
    assert!(err.contains("must have headers"), "{err}");
}

#[test]
fn empty_id_is_rejected_with_row_number() {
    let (_dir, path) = write_csv(
        "id,kind,label,connector,fiber_length_m\n\
         coil-1,FIBER_COIL,Fiber coil,SC_APC,1000\n\
         ,FIBER_COIL,Nameless,SC_APC,500\n",
    );
    let err = load_catalog_csv(&path).unwrap_err().to_string();
    assert!(err.contains("row 3"), "{err}");
    assert!(err.contains("empty id"), "{err}");
}

#[test]
fn negative_length_is_rejected() {
    let (_dir, path) = write_csv(
        "id,kind,label,connector,fiber_length_m\n\
         coil-1,FIBER_COIL,Fiber coil,SC_APC,-5\n",
    );
    assert!(load_catalog_csv(&path).is_err());
}

#[test]
fn header_only_file_is_an_error() {
    let (_dir, path) = write_csv("id,kind,label,connector,fiber_length_m\n");
    let err = load_catalog_csv(&path).unwrap_err().to_string();
    assert!(err.contains("no component rows"), "{err}");
}

#[test]
fn non_numeric_length_is_a_parse_error() {
    let (_dir, path) = write_csv(
        "id,kind,label,connector,fiber_length_m\n\
         coil-1,FIBER_COIL,Fiber coil,SC_APC,long\n",
    );
    let err = load_catalog_csv(&path).unwrap_err().to_string();
    assert!(err.contains("invalid CSV row 2"), "{err}");
}
