//! Integration tests for migoto-export
//!
//! Exercises the full pipeline: OBJ -> mod buffer folder -> OBJ, through
//! both the library API and the binary.

use std::fs;
use std::path::Path;

use migoto_export::{files, model, obj};
use tempfile::tempdir;

const CUBE_OBJ: &str = "\
o cube
v -1 -1 -1
v 1 -1 -1
v 1 1 -1
v -1 1 -1
v -1 -1 1
v 1 -1 1
v 1 1 1
v -1 1 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
f 5/1 8/4 7/3 6/2
f 1/1 5/2 6/3 2/4
f 2/1 6/2 7/3 3/4
f 3/1 7/2 8/3 4/4
f 4/1 8/2 5/3 1/4
";

fn write_cube(path: &Path) {
    fs::write(path, CUBE_OBJ).expect("failed to write test OBJ");
}

#[test]
fn library_round_trip_preserves_geometry() {
    let dir = tempdir().expect("failed to create temp dir");
    let obj_path = dir.path().join("cube.obj");
    let mod_dir = dir.path().join("mod");
    write_cube(&obj_path);

    let mesh = obj::load_obj(&obj_path).expect("failed to load OBJ");
    assert_eq!(mesh.indices.len(), 36);

    let data_model = model::DataModel::wwmi();
    let exported = data_model
        .export(
            &mesh,
            &model::ExportOptions::default(),
            &mut model::ExportCache::new(),
        )
        .expect("export failed");
    let metadata = files::build_metadata(&exported, None);
    files::write_mod_folder(&mod_dir, &exported, &metadata).expect("write failed");

    assert!(mod_dir.join("Position.buf").exists());
    assert!(mod_dir.join("Index.buf").exists());
    assert!(mod_dir.join("Metadata.json").exists());
    // Position.buf is raw R32G32B32_FLOAT elements
    let position_bytes = fs::read(mod_dir.join("Position.buf")).unwrap();
    assert_eq!(position_bytes.len(), mesh.positions.len() * 12);

    let back = files::import_mesh(&mod_dir, &data_model).expect("import failed");
    assert_eq!(back.positions, mesh.positions);
    assert_eq!(back.indices, mesh.indices);
}

#[test]
fn binary_export_then_import_round_trips() {
    let dir = tempdir().expect("failed to create temp dir");
    let obj_path = dir.path().join("cube.obj");
    let mod_dir = dir.path().join("mod");
    let out_obj = dir.path().join("back.obj");
    write_cube(&obj_path);

    run(&[
        "export",
        obj_path.to_str().unwrap(),
        "-o",
        mod_dir.to_str().unwrap(),
    ]);
    assert!(mod_dir.join("Index.buf").exists());

    run(&[
        "import",
        mod_dir.to_str().unwrap(),
        "-o",
        out_obj.to_str().unwrap(),
    ]);

    let original = obj::load_obj(&obj_path).expect("failed to load original");
    let back = obj::load_obj(&out_obj).expect("failed to load reimport");
    assert_eq!(back.positions, original.positions);
    assert_eq!(back.indices, original.indices);
}

#[test]
fn inspect_reads_the_written_metadata() {
    let dir = tempdir().expect("failed to create temp dir");
    let obj_path = dir.path().join("cube.obj");
    let mod_dir = dir.path().join("mod");
    write_cube(&obj_path);

    run(&[
        "export",
        obj_path.to_str().unwrap(),
        "-o",
        mod_dir.to_str().unwrap(),
    ]);
    run(&["inspect", mod_dir.join("Metadata.json").to_str().unwrap()]);
}

#[test]
fn mirrored_export_flips_positions() {
    let dir = tempdir().expect("failed to create temp dir");
    let obj_path = dir.path().join("cube.obj");
    let mod_dir = dir.path().join("mod");
    write_cube(&obj_path);

    run(&[
        "export",
        obj_path.to_str().unwrap(),
        "-o",
        mod_dir.to_str().unwrap(),
        "--mirror",
    ]);

    let data_model = model::DataModel::wwmi();
    let back = files::import_mesh(&mod_dir, &data_model).expect("import failed");
    let original = obj::load_obj(&obj_path).expect("failed to load original");
    for (mirrored, original) in back.positions.iter().zip(&original.positions) {
        assert_eq!(mirrored[0], -original[0]);
        assert_eq!(mirrored[1], original[1]);
        assert_eq!(mirrored[2], original[2]);
    }
    // a mirrored export keeps the source winding; the import must not
    // un-flip what was never flipped
    assert_eq!(back.indices, original.indices);
}

// Helper to run the migoto-export binary
fn run(args: &[&str]) {
    let status = std::process::Command::new(env!("CARGO_BIN_EXE_migoto-export"))
        .args(args)
        .status()
        .expect("failed to run migoto-export");
    assert!(status.success(), "migoto-export {args:?} failed");
}
