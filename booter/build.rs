/*++

Licensed under the Apache-2.0 license.

File Name:

    build.rs

Abstract:

    Build script for the booter. Embeds the LS verification keys.

--*/

use std::env;
use std::error::Error;
use std::fmt::Write;
use std::fs;
use std::path::PathBuf;

const MODULUS_SIZE: usize = 384;

/// Read a raw big-endian modulus named by `var`. An unset variable yields an
/// all-zero modulus, which the verifier refuses to use.
fn modulus(var: &str) -> Result<Vec<u8>, Box<dyn Error>> {
    println!("cargo:rerun-if-env-changed={var}");
    let Ok(path) = env::var(var) else {
        return Ok(vec![0; MODULUS_SIZE]);
    };
    println!("cargo:rerun-if-changed={path}");
    let bytes = fs::read(&path)?;
    if bytes.len() != MODULUS_SIZE {
        return Err(format!("{path}: expected {MODULUS_SIZE} bytes, found {}", bytes.len()).into());
    }
    Ok(bytes)
}

fn emit_key(out: &mut String, name: &str, modulus: &[u8]) -> Result<(), Box<dyn Error>> {
    writeln!(out, "pub const {name}: Rsa3072PubKey = Rsa3072PubKey::new([")?;
    for line in modulus.chunks(16) {
        out.push_str("   ");
        for byte in line {
            write!(out, " 0x{byte:02x},")?;
        }
        out.push('\n');
    }
    writeln!(out, "]);")?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    let mut out = String::new();
    emit_key(&mut out, "PROD_LS_KEY", &modulus("BOOTER_PROD_KEY")?)?;
    emit_key(&mut out, "DEBUG_LS_KEY", &modulus("BOOTER_DEBUG_KEY")?)?;
    fs::write(out_dir.join("ls_keys.rs"), out)?;

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
