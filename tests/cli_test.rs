use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::{PathBuf,Path};
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

// Copy a test file into the temporary directory under a new name.
fn stage(base_name: &str,new_name: &str,temp_dir: &tempfile::TempDir) -> Result<PathBuf,Box<dyn std::error::Error>> {
    let dest = temp_dir.path().join(new_name);
    std::fs::copy(Path::new("tests").join(base_name),&dest)?;
    Ok(dest)
}

fn round_trip_test(base_name: &str,format: &str) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = stage(base_name,base_name,&temp_dir)?;
    let packed_path = temp_dir.path().join([base_name,".uc"].concat());
    Command::cargo_bin("unicompress")?
        .arg("compress")
        .arg("--no-minify")
        .arg("-f").arg(format)
        .arg(&in_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 1 of 1 files successfully."));
    // move the original aside so decompression recreates it
    let orig_path = temp_dir.path().join("original");
    std::fs::rename(&in_path,&orig_path)?;
    Command::cargo_bin("unicompress")?
        .arg("decompress")
        .arg("-f").arg(format)
        .arg(&packed_path)
        .assert()
        .success();
    match (std::fs::read(orig_path),std::fs::read(in_path)) {
        (Ok(v1),Ok(v2)) => {
            assert_eq!(v1,v2);
        },
        _ => panic!("unable to compare output with original")
    }
    Ok(())
}

#[test]
fn text_round_trip() -> STDRESULT {
    round_trip_test("sample.txt","wide")
}

#[test]
fn text_round_trip_legacy() -> STDRESULT {
    // legacy only survives when every length and distance fits a byte
    round_trip_test("short.txt","legacy")
}

#[test]
fn html_is_minified() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = stage("sample.html","page.html",&temp_dir)?;
    Command::cargo_bin("unicompress")?
        .arg("compress")
        .arg(&in_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Detected HTML file"));
    let expected = unicompress::html::minify(&std::fs::read_to_string(&in_path)?);
    std::fs::remove_file(&in_path)?;
    Command::cargo_bin("unicompress")?
        .arg("expand")
        .arg(temp_dir.path().join("page.html.uc"))
        .assert()
        .success();
    let actual = std::fs::read_to_string(&in_path)?;
    assert!(!actual.contains("<!--"));
    assert_eq!(actual,expected);
    Ok(())
}

#[test]
fn output_is_utf8_text() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = stage("sample.txt","notes.txt",&temp_dir)?;
    Command::cargo_bin("unicompress")?
        .arg("compress")
        .arg(&in_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Compression ratio:"));
    let packed = std::fs::read(temp_dir.path().join("notes.txt.uc"))?;
    let lib_packed = unicompress::compress_text(&std::fs::read_to_string(&in_path)?,&unicompress::STD_OPTIONS)?;
    assert_eq!(packed,lib_packed.to_bytes());
    Ok(())
}

#[test]
fn decompress_without_suffix() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("packed");
    std::fs::write(&in_path,unicompress::compress_text("hello hello hello",&unicompress::STD_OPTIONS)?.to_bytes())?;
    Command::cargo_bin("unicompress")?
        .arg("decompress")
        .arg(&in_path)
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(temp_dir.path().join("packed.decompressed"))?,"hello hello hello");
    Ok(())
}

#[test]
fn batch_continues_past_failures() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let good = stage("sample.txt","good.txt",&temp_dir)?;
    let missing = temp_dir.path().join("missing.txt");
    let binary = temp_dir.path().join("binary.dat");
    std::fs::write(&binary,[0x00,0xff,0xfe,0x80])?;
    Command::cargo_bin("unicompress")?
        .arg("compress")
        .arg(&missing)
        .arg(&binary)
        .arg(&good)
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 1 of 3 files successfully."))
        .stdout(predicate::str::contains("missing.txt: Failed"))
        .stderr(predicate::str::contains("File not found"));
    assert!(temp_dir.path().join("good.txt.uc").exists());
    assert!(!temp_dir.path().join("binary.dat.uc").exists());
    Ok(())
}

#[test]
fn corrupt_input_writes_nothing() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("broken.uc");
    // header promises 5 bytes, only one code point follows
    std::fs::write(&in_path,"\u{105}\u{261}")?;
    Command::cargo_bin("unicompress")?
        .arg("decompress")
        .arg(&in_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("broken.uc: Failed"))
        .stderr(predicate::str::contains("shorter than its declared length"));
    assert!(!temp_dir.path().join("broken").exists());
    Ok(())
}

#[test]
fn help_and_version() -> STDRESULT {
    Command::cargo_bin("unicompress")?.assert().code(0);
    Command::cargo_bin("unicompress")?.arg("--help").assert().code(0);
    Command::cargo_bin("unicompress")?.arg("-h").assert().code(0);
    Command::cargo_bin("unicompress")?
        .arg("--version")
        .assert()
        .code(0)
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Command::cargo_bin("unicompress")?.arg("-v").assert().code(0);
    Ok(())
}

#[test]
fn bad_arguments() -> STDRESULT {
    Command::cargo_bin("unicompress")?.arg("squash").arg("a.txt").assert().code(1);
    Command::cargo_bin("unicompress")?.arg("compress").assert().code(1);
    Command::cargo_bin("unicompress")?
        .arg("compress")
        .arg("-f").arg("narrow")
        .arg("a.txt")
        .assert()
        .code(1);
    Ok(())
}
