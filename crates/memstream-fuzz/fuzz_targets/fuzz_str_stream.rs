#![no_main]
use std::io::SeekFrom;

use libfuzzer_sys::fuzz_target;
use memstream_core::{StrBuffer, StreamConfig, parse_mode, string};

fn well_formed(buf: &StrBuffer) -> bool {
    buf.as_bytes_with_nul().is_none_or(|raw| {
        raw.iter().position(|&b| b == 0) == Some(raw.len() - 1) && raw.len() == buf.len() + 1
    })
}

// The first line of input is the mode string, the rest an op stream with
// arbitrary payloads (terminators included). The handle must stay
// terminated and the cursor inside the content at every flush.
fuzz_target!(|data: &[u8]| {
    let split = data.iter().position(|&b| b == b'\n').unwrap_or(data.len());
    let mode = String::from_utf8_lossy(&data[..split.min(4)]).into_owned();
    let mut ops = data.get(split + 1..).unwrap_or_default();

    let flags = parse_mode(&mode);
    let mut handle = StrBuffer::from("initial text");
    let before = handle.clone();
    let cfg = StreamConfig::default().with_max_len(4096);

    let mut stream = match string::open_with(&mut handle, &mode, &cfg) {
        Ok(stream) => stream,
        Err(_) => {
            // Refused modes leave the caller's buffer alone.
            if !flags.has_access() {
                assert_eq!(handle, before);
            }
            return;
        }
    };

    while let Some((&op, rest)) = ops.split_first() {
        ops = rest;
        match op % 4 {
            0 => {
                let n = usize::from(op >> 2).min(ops.len());
                let (payload, rest) = ops.split_at(n);
                ops = rest;
                let _ = stream.fwrite(payload);
            }
            1 => {
                let mut dst = [0u8; 64];
                let _ = stream.fread(&mut dst[..usize::from(op >> 2)]);
            }
            2 => {
                let _ = stream.fseek(SeekFrom::Current(i64::from(op as i8 >> 2)));
            }
            _ => {
                if stream.fflush().is_ok() {
                    let len = stream.get_ref().map_or(0, StrBuffer::len);
                    assert!(stream.ftell().is_ok_and(|p| p <= len as u64));
                    assert!(stream.get_ref().is_none_or(well_formed));
                }
            }
        }
    }

    drop(stream);
    assert!(well_formed(&handle));
});
