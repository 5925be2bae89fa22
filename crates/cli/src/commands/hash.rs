// SPDX-License-Identifier: MIT

//! `jm hash`: compute the content hash used by dedupe_key/artifact lookups.

use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::Read;

pub fn run(path: &str) -> anyhow::Result<()> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    println!("{:x}  {path}", digest);
    Ok(())
}
