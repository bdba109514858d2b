use assert_cmd::prelude::*; // Add methods on commands
use bit_vec::BitVec;
use predicates::prelude::*;
use std::process::Command; // Run programs
use tempfile;
use unlzh::STDRESULT;

/// append `n` bits of `val` to the payload under construction, MSB first
fn put_bits(bv: &mut BitVec, val: u16, n: usize) {
    for i in (0..n).rev() {
        bv.push(val >> i & 1 == 1);
    }
}

/// payload expanding to the single byte `A`, using the collapsed one-symbol
/// tables throughout
fn literal_a_payload() -> Vec<u8> {
    let mut bv = BitVec::new();
    put_bits(&mut bv,1,16);
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,9);
    put_bits(&mut bv,0x41,9);
    put_bits(&mut bv,0,4);
    put_bits(&mut bv,0,4);
    bv.to_bytes()
}

/// payload whose meta code declares an impossible 17 bit length
fn bad_table_payload() -> Vec<u8> {
    let mut bv = BitVec::new();
    put_bits(&mut bv,1,16);
    put_bits(&mut bv,1,5);
    put_bits(&mut bv,0b11111111111110,14);
    bv.to_bytes()
}

fn build_archive(filename: &str, payload: &[u8], original_size: u32, crc: u16) -> Vec<u8> {
    let name = filename.as_bytes();
    let header_size = 23 + name.len();
    let mut ans = vec![0u8;header_size + 4];
    ans[0] = header_size as u8;
    ans[2..7].copy_from_slice(b"-lh5-");
    ans[7..11].copy_from_slice(&u32::to_le_bytes(payload.len() as u32));
    ans[11..15].copy_from_slice(&u32::to_le_bytes(original_size));
    ans[19] = 0x20;
    ans[20] = 1;
    ans[21] = name.len() as u8;
    ans[22..22 + name.len()].copy_from_slice(name);
    ans[22 + name.len()..24 + name.len()].copy_from_slice(&u16::to_le_bytes(crc));
    ans[1] = ans[2..2 + header_size].iter().fold(0u8,|sum,&b| sum.wrapping_add(b));
    ans.extend_from_slice(payload);
    ans
}

#[test]
fn extraction() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let archive_path = temp_dir.path().join("sam.lzh");
    std::fs::write(&archive_path,build_archive("SAM.TXT",&literal_a_payload(),1,0x30c0))?;
    let mut cmd = Command::cargo_bin("unlzh")?;
    cmd.current_dir(temp_dir.path())
        .arg(&archive_path)
        .assert()
        .success();
    assert_eq!(std::fs::read(temp_dir.path().join("SAM.TXT"))?,b"A");
    Ok(())
}

#[test]
fn missing_argument() -> STDRESULT {
    let mut cmd = Command::cargo_bin("unlzh")?;
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error: archive file not specified"));
    Ok(())
}

#[test]
fn open_failure() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let mut cmd = Command::cargo_bin("unlzh")?;
    cmd.current_dir(temp_dir.path())
        .arg("no_such_archive.lzh")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Failed to open \"no_such_archive.lzh\""));
    Ok(())
}

#[test]
fn crc_mismatch_keeps_file() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let archive_path = temp_dir.path().join("sam.lzh");
    std::fs::write(&archive_path,build_archive("SAM.TXT",&literal_a_payload(),1,0xbeef))?;
    let mut cmd = Command::cargo_bin("unlzh")?;
    cmd.current_dir(temp_dir.path())
        .arg(&archive_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("Error: CRC error: \"SAM.TXT\""));
    assert_eq!(std::fs::read(temp_dir.path().join("SAM.TXT"))?,b"A");
    Ok(())
}

#[test]
fn bad_attribute_leaves_no_file() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let archive_path = temp_dir.path().join("sam.lzh");
    let mut raw = build_archive("SAM.TXT",&literal_a_payload(),1,0x30c0);
    raw[19] = 0x10;
    std::fs::write(&archive_path,raw)?;
    let mut cmd = Command::cargo_bin("unlzh")?;
    cmd.current_dir(temp_dir.path())
        .arg(&archive_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Invalid lha header attribute byte."));
    assert!(!temp_dir.path().join("SAM.TXT").exists());
    Ok(())
}

#[test]
fn bad_table_fails_before_output() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let archive_path = temp_dir.path().join("sam.lzh");
    std::fs::write(&archive_path,build_archive("SAM.TXT",&bad_table_payload(),1,0x30c0))?;
    let mut cmd = Command::cargo_bin("unlzh")?;
    cmd.current_dir(temp_dir.path())
        .arg(&archive_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Bad table (case a)"));
    assert_eq!(std::fs::read(temp_dir.path().join("SAM.TXT"))?,b"");
    Ok(())
}
