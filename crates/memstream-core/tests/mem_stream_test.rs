use std::io::SeekFrom;

use memstream_core::{MemBuffer, StreamConfig, StreamError, mem};

const INITIAL: &[u8] = b"Hello World!\0";

fn rw_fixture() -> MemBuffer {
    MemBuffer::from(INITIAL)
}

#[test]
fn read_returns_whole_buffer_including_terminator_byte() {
    let mut buf = rw_fixture();
    let mut s = mem::open(&mut buf, "r+").expect("open r+");
    let mut dst = [0u8; 1024];
    let n = s.fread(&mut dst).expect("fread");
    assert!(!s.ferror());
    assert_eq!(n, INITIAL.len());
    assert_eq!(&dst[..n], INITIAL);
    assert!(s.feof());
}

#[test]
fn write_overwrites_from_start() {
    let mut buf = rw_fixture();
    let mut s = mem::open(&mut buf, "r+").expect("open r+");
    assert_eq!(s.fwrite(b"How are you?").expect("fwrite"), 12);
    s.fflush().expect("fflush");
    assert_eq!(
        s.get_ref().and_then(MemBuffer::as_bytes),
        Some(&b"How are you?\0"[..])
    );
}

#[test]
fn tell_starts_at_zero_and_tracks_seek() {
    let mut buf = rw_fixture();
    let mut s = mem::open(&mut buf, "r+").expect("open r+");
    assert_eq!(s.ftell().expect("ftell"), 0);
    assert_eq!(s.fseek(SeekFrom::Start(5)).expect("fseek"), 5);
    assert_eq!(s.ftell().expect("ftell"), 5);

    let mut dst = [0u8; 1024];
    let n = s.fread(&mut dst).expect("fread");
    assert_eq!(n, INITIAL.len() - 5);
    assert_eq!(&dst[..n], &INITIAL[5..]);
}

#[test]
fn write_at_end_grows_by_payload() {
    let mut buf = rw_fixture();
    let msg = b" How are you?\0";
    {
        let mut s = mem::open(&mut buf, "r+").expect("open r+");
        s.fseek(SeekFrom::End(0)).expect("seek end");
        assert_eq!(s.fwrite(msg).expect("fwrite"), msg.len());
        s.fflush().expect("fflush");
        assert_eq!(s.get_ref().map(MemBuffer::len), Some(INITIAL.len() + msg.len()));
    }
    let bytes = buf.as_bytes().expect("non-null");
    assert_eq!(&bytes[..INITIAL.len()], INITIAL);
    assert_eq!(&bytes[INITIAL.len()..], msg);
}

#[test]
fn reread_after_rewind_reproduces_content() {
    let content: Vec<u8> = (0..=255u8).cycle().take(20_000).collect();
    let mut buf = MemBuffer::from(content.clone());
    let mut s = mem::open(&mut buf, "r").expect("open r");

    let mut first = Vec::new();
    std::io::Read::read_to_end(&mut s, &mut first).expect("first pass");
    s.rewind().expect("rewind");
    let mut second = Vec::new();
    std::io::Read::read_to_end(&mut s, &mut second).expect("second pass");

    assert_eq!(first, content);
    assert_eq!(second, content);
}

#[test]
fn written_bytes_read_back_at_same_offset() {
    let mut buf = MemBuffer::from("0123456789");
    let mut s = mem::open(&mut buf, "r+").expect("open r+");
    s.fseek(SeekFrom::Start(4)).expect("seek");
    s.fwrite(b"wxyz").expect("fwrite");
    s.fflush().expect("fflush");
    s.fseek(SeekFrom::Start(4)).expect("seek back");
    let mut dst = [0u8; 4];
    assert_eq!(s.fread(&mut dst).expect("fread"), 4);
    assert_eq!(&dst, b"wxyz");
}

#[test]
fn append_adds_at_tail_and_keeps_read_offset() {
    let mut buf = MemBuffer::from("12345");
    {
        let mut s = mem::open(&mut buf, "a+").expect("open a+");
        assert_eq!(s.ftell().expect("ftell"), 0);
        s.fwrite(b"abc").expect("fwrite");
        s.fflush().expect("fflush");
        assert_eq!(s.get_ref().map(MemBuffer::len), Some(8));
        assert_eq!(s.ftell().expect("ftell"), 0);
        assert_eq!(s.fgetc().expect("fgetc"), Some(b'1'));
    }
    assert_eq!(buf.as_bytes(), Some(&b"12345abc"[..]));
}

#[test]
fn plain_append_starts_at_end() {
    let mut buf = MemBuffer::from("12345");
    let mut s = mem::open(&mut buf, "a").expect("open a");
    assert_eq!(s.ftell().expect("ftell"), 5);
    // Seeking is allowed but writes still land at the end.
    s.fseek(SeekFrom::Start(1)).expect("seek");
    s.fwrite(b"!").expect("fwrite");
    s.fclose().expect("fclose");
    assert_eq!(buf.as_bytes(), Some(&b"12345!"[..]));
}

#[test]
fn write_mode_truncates_existing_buffer() {
    let mut buf = MemBuffer::from("stale content");
    {
        let s = mem::open(&mut buf, "w").expect("open w");
        assert_eq!(s.get_ref().map(MemBuffer::len), Some(0));
    }
    assert_eq!(buf.as_bytes(), Some(&b""[..]));
}

#[test]
fn creating_modes_allocate_null_handle() {
    for mode in ["w", "w+", "wb", "a", "a+", "ab+"] {
        let mut buf = MemBuffer::null();
        {
            let mut s = mem::open(&mut buf, mode).expect(mode);
            s.fwrite(b"x").expect("fwrite");
        }
        assert_eq!(buf.as_bytes(), Some(&b"x"[..]), "mode={mode}");
    }
}

#[test]
fn non_creating_modes_reject_null_handle() {
    for mode in ["r", "r+", "rb", "rb+"] {
        let mut buf = MemBuffer::null();
        let err = mem::open(&mut buf, mode).expect_err(mode);
        assert_eq!(err, StreamError::MissingBuffer);
        assert_eq!(err.errno(), libc::ENOENT);
        assert!(buf.is_null(), "mode={mode}");
    }
}

#[test]
fn seek_past_end_fails_and_keeps_position() {
    let mut buf = MemBuffer::from("abcd");
    let mut s = mem::open(&mut buf, "r+").expect("open r+");
    s.fseek(SeekFrom::Start(2)).expect("seek");
    let err = s.fseek(SeekFrom::Start(5)).expect_err("past end");
    assert_eq!(err.errno(), libc::EINVAL);
    assert_eq!(s.ftell().expect("ftell"), 2);
    assert_eq!(s.fseek(SeekFrom::Start(4)).expect("exactly end"), 4);
    assert!(s.fseek(SeekFrom::Current(-5)).is_err());
}

#[test]
fn allocation_ceiling_fails_write_without_mutation() {
    let cfg = StreamConfig::unbuffered().with_max_len(4);
    let mut buf = MemBuffer::from("abc");
    let mut s = mem::open_with(&mut buf, "r+", &cfg).expect("open");
    s.fseek(SeekFrom::End(0)).expect("seek end");
    let err = s.fwrite(b"de").expect_err("over ceiling");
    assert_eq!(err, StreamError::AllocationFailure { requested: 5 });
    assert!(s.ferror());
    drop(s);
    assert_eq!(buf.as_bytes(), Some(&b"abc"[..]));
}

#[test]
fn io_traits_compose_with_std() {
    use std::io::{BufRead, BufReader, Write};

    let mut buf = MemBuffer::null();
    {
        let mut s = mem::open(&mut buf, "w+").expect("open w+");
        writeln!(s, "alpha").expect("line 1");
        writeln!(s, "beta").expect("line 2");
        s.rewind().expect("rewind");
        let lines: Vec<String> = BufReader::new(&mut s)
            .lines()
            .collect::<Result<_, _>>()
            .expect("lines");
        assert_eq!(lines, ["alpha", "beta"]);
    }
    assert_eq!(buf.into_vec(), Some(b"alpha\nbeta\n".to_vec()));
}
