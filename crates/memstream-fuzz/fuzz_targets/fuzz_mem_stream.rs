#![no_main]
use std::io::SeekFrom;

use libfuzzer_sys::fuzz_target;
use memstream_core::{BufMode, MemBuffer, StreamConfig, mem};

// Byte 0 picks the mode and buffering, the rest is an op stream. Every
// write is mirrored into a plain Vec and the published buffer must match
// it after each flush.
fuzz_target!(|data: &[u8]| {
    let Some((&head, mut ops)) = data.split_first() else {
        return;
    };
    let mode = ["r+", "w+", "a+"][usize::from(head % 3)];
    let buf_mode = [BufMode::Full, BufMode::Line, BufMode::None][usize::from((head >> 2) % 3)];
    let cfg = StreamConfig::default().with_buffering(buf_mode, 16 + usize::from(head >> 4));

    let mut handle = MemBuffer::from(&b"seed"[..]);
    let mut model: Vec<u8> = if mode == "w+" { Vec::new() } else { b"seed".to_vec() };
    let mut pos = 0usize;
    let append = mode == "a+";

    let Ok(mut stream) = mem::open_with(&mut handle, mode, &cfg) else {
        return;
    };

    while let Some((&op, rest)) = ops.split_first() {
        ops = rest;
        match op % 5 {
            0 => {
                let n = usize::from(op >> 3).min(ops.len());
                let (payload, rest) = ops.split_at(n);
                ops = rest;
                assert_eq!(stream.fwrite(payload).ok(), Some(n));
                let target = if append { model.len() } else { pos };
                if target + n > model.len() {
                    model.resize(target + n, 0);
                }
                model[target..target + n].copy_from_slice(payload);
                if !append {
                    pos = target + n;
                }
            }
            1 => {
                let mut dst = [0u8; 32];
                let want = usize::from(op >> 3);
                let got = stream.fread(&mut dst[..want]).unwrap_or(0);
                let end = (pos + want).min(model.len());
                assert_eq!(&dst[..got], &model[pos..end]);
                pos = end;
            }
            2 => {
                let to = usize::from(op >> 3);
                let ok = stream.fseek(SeekFrom::Start(to as u64)).is_ok();
                assert_eq!(ok, to <= model.len());
                if ok {
                    pos = to;
                }
            }
            3 => {
                assert!(stream.fflush().is_ok());
                assert_eq!(stream.get_ref().and_then(MemBuffer::as_bytes), Some(&model[..]));
            }
            _ => {
                assert_eq!(stream.ftell().ok(), Some(pos as u64));
            }
        }
    }

    let _ = stream.fclose();
    assert_eq!(handle.as_bytes(), Some(&model[..]));
});
