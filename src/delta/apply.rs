//! Delta replay: reconstruct a target from a source plus an encoded delta.

use anyhow::{Result, bail};

use super::checksum;

/// Decode one base-64 integer starting at `*pos`, advancing past its digits.
/// Returns `None` when no digit is present.
fn get_int(delta: &[u8], pos: &mut usize) -> Option<u32> {
    let mut v: u32 = 0;
    let mut any = false;
    while let Some(&c) = delta.get(*pos) {
        let digit = match c {
            b'0'..=b'9' => c - b'0',
            b'A'..=b'Z' => c - b'A' + 10,
            b'_' => 36,
            b'a'..=b'z' => c - b'a' + 37,
            b'~' => 63,
            _ => break,
        };
        v = (v << 6) | digit as u32;
        any = true;
        *pos += 1;
    }
    any.then_some(v)
}

/// Read the target length from the delta header without replaying it.
pub fn output_size(delta: &[u8]) -> Result<usize> {
    let mut pos = 0;
    match get_int(delta, &mut pos) {
        Some(n) if delta.get(pos) == Some(&b'\n') => Ok(n as usize),
        _ => bail!("malformed delta: missing size header"),
    }
}

/// Replay `delta` against `src`, returning the reconstructed target.
///
/// Fails on malformed input, on copy ranges outside the source, and on a
/// checksum or length mismatch between the reconstruction and the trailer.
pub fn apply(src: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let total = output_size(delta)?;
    let mut pos = delta
        .iter()
        .position(|&c| c == b'\n')
        .map(|p| p + 1)
        .unwrap_or(delta.len());
    let mut out = Vec::with_capacity(total);

    loop {
        let Some(cnt) = get_int(delta, &mut pos) else {
            bail!("malformed delta: expected segment length");
        };
        let cnt = cnt as usize;
        match delta.get(pos) {
            Some(b'@') => {
                pos += 1;
                let Some(ofst) = get_int(delta, &mut pos) else {
                    bail!("malformed delta: copy without offset");
                };
                let ofst = ofst as usize;
                if delta.get(pos) != Some(&b',') {
                    bail!("malformed delta: unterminated copy command");
                }
                pos += 1;
                let Some(chunk) = src.get(ofst..ofst + cnt) else {
                    bail!("delta copy out of source bounds: {cnt}@{ofst}");
                };
                out.extend_from_slice(chunk);
            }
            Some(b':') => {
                pos += 1;
                let Some(chunk) = delta.get(pos..pos + cnt) else {
                    bail!("delta literal truncated");
                };
                out.extend_from_slice(chunk);
                pos += cnt;
            }
            Some(b';') => {
                if out.len() != total {
                    bail!(
                        "delta size mismatch: header says {total}, replay produced {}",
                        out.len()
                    );
                }
                let ck = checksum(&out);
                if ck != cnt as u32 {
                    bail!("delta checksum mismatch");
                }
                return Ok(out);
            }
            _ => bail!("malformed delta: unknown segment marker"),
        }
    }
}
