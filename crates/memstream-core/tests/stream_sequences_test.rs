//! Deterministic operation sequences checked against a plain `Vec` model.

use std::io::SeekFrom;

use memstream_core::{
    BufMode, BufferedStream, MemBuffer, SeekableBackend, StrBuffer, StreamConfig, mem, string,
};

#[derive(Clone, Copy, Debug)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn gen_range_usize(&mut self, low: usize, high_inclusive: usize) -> usize {
        let span = high_inclusive - low + 1;
        low + (self.next_u64() as usize % span)
    }

    /// Payload without NUL bytes.
    fn payload(&mut self, max_len: usize) -> Vec<u8> {
        let len = self.gen_range_usize(1, max_len);
        (0..len)
            .map(|_| self.gen_range_usize(1, 255) as u8)
            .collect()
    }
}

#[derive(Debug, Default)]
struct Model {
    content: Vec<u8>,
    pos: usize,
    append: bool,
}

impl Model {
    fn write(&mut self, data: &[u8]) {
        let target = if self.append {
            self.content.len()
        } else {
            self.pos
        };
        let end = target + data.len();
        if end > self.content.len() {
            self.content.resize(end, 0);
        }
        self.content[target..end].copy_from_slice(data);
        if !self.append {
            self.pos = end;
        }
    }

    fn read(&mut self, n: usize) -> Vec<u8> {
        let end = (self.pos + n).min(self.content.len());
        let out = self.content[self.pos..end].to_vec();
        self.pos = end;
        out
    }

    fn seek(&mut self, to: usize) -> bool {
        if to > self.content.len() {
            return false;
        }
        self.pos = to;
        true
    }
}

const SEEDS: [u64; 4] = [1, 2, 3, 0x5EED];
const STEPS: usize = 600;

fn configs() -> [StreamConfig; 3] {
    [
        StreamConfig::default().with_buffering(BufMode::Full, 16),
        StreamConfig::default().with_buffering(BufMode::Line, 8),
        StreamConfig::unbuffered(),
    ]
}

fn drive<B: SeekableBackend>(
    s: &mut BufferedStream<B>,
    model: &mut Model,
    rng: &mut XorShift64,
    published_len: impl Fn(&B::Handle) -> usize,
    ctx: &str,
) {
    for step in 0..STEPS {
        match rng.gen_range_usize(0, 4) {
            0 | 1 => {
                let data = rng.payload(24);
                assert_eq!(s.fwrite(&data), Ok(data.len()), "{ctx} step={step}");
                model.write(&data);
            }
            2 => {
                let n = rng.gen_range_usize(1, 32);
                let mut dst = vec![0u8; n];
                let got = s.fread(&mut dst).expect("fread");
                assert_eq!(&dst[..got], model.read(n).as_slice(), "{ctx} step={step}");
            }
            3 => {
                s.fflush().expect("fflush");
                let len = s.get_ref().map(&published_len);
                assert_eq!(len, Some(model.content.len()), "{ctx} step={step}");
            }
            _ => {
                let to = rng.gen_range_usize(0, model.content.len() + 2);
                let ok = s.fseek(SeekFrom::Start(to as u64)).is_ok();
                assert_eq!(ok, model.seek(to), "{ctx} step={step} seek={to}");
            }
        }
        assert_eq!(s.ftell(), Ok(model.pos as u64), "{ctx} step={step}");
    }
}

#[test]
fn memory_stream_matches_model() {
    for seed in SEEDS {
        for (ci, cfg) in configs().iter().enumerate() {
            for mode in ["r+", "w+", "a+"] {
                let ctx = format!("seed={seed} cfg={ci} mode={mode}");
                let mut rng = XorShift64::new(seed);
                let initial = rng.payload(40);
                let mut buf = MemBuffer::from(initial.clone());
                let mut model = Model {
                    content: if mode == "w+" { Vec::new() } else { initial },
                    pos: 0,
                    append: mode == "a+",
                };
                {
                    let mut s = mem::open_with(&mut buf, mode, cfg).expect(&ctx);
                    drive(&mut s, &mut model, &mut rng, MemBuffer::len, &ctx);
                    s.fclose().expect("fclose");
                }
                assert_eq!(buf.as_bytes(), Some(model.content.as_slice()), "{ctx}");
            }
        }
    }
}

#[test]
fn string_stream_matches_model() {
    for seed in SEEDS {
        for (ci, cfg) in configs().iter().enumerate() {
            for mode in ["r+", "w+", "a+"] {
                let ctx = format!("seed={seed} cfg={ci} mode={mode}");
                let mut rng = XorShift64::new(seed ^ 0xABCD);
                let initial = rng.payload(40);
                let mut buf = StrBuffer::from_bytes(&initial);
                let mut model = Model {
                    content: if mode == "w+" { Vec::new() } else { initial },
                    pos: 0,
                    append: mode == "a+",
                };
                {
                    let mut s = string::open_with(&mut buf, mode, cfg).expect(&ctx);
                    drive(&mut s, &mut model, &mut rng, StrBuffer::len, &ctx);
                    s.fclose().expect("fclose");
                }
                assert_eq!(buf.as_bytes(), Some(model.content.as_slice()), "{ctx}");
                let raw = buf.as_bytes_with_nul().expect("non-null");
                assert_eq!(raw.len(), model.content.len() + 1, "{ctx}");
                assert_eq!(raw.last(), Some(&0), "{ctx}");
            }
        }
    }
}

#[test]
fn growth_is_exactly_the_new_tail() {
    let mut rng = XorShift64::new(99);
    let mut buf = MemBuffer::new();
    let mut s = mem::open_with(&mut buf, "r+", &StreamConfig::unbuffered()).expect("open");
    for _ in 0..200 {
        let before = s.get_ref().map_or(0, MemBuffer::len);
        let at = rng.gen_range_usize(0, before);
        s.fseek(SeekFrom::Start(at as u64)).expect("seek in bounds");
        let data = rng.payload(16);
        s.fwrite(&data).expect("fwrite");
        let after = s.get_ref().map_or(0, MemBuffer::len);
        let tail = (at + data.len()).saturating_sub(before);
        assert_eq!(after, before + tail);
        assert!(after >= before);
    }
}
