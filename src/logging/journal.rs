use std::os::fd::AsFd as _;

/// Whether stderr is the stream systemd handed us for the journal.
///
/// systemd exports `$JOURNAL_STREAM` as `<device>:<inode>` of the stream it
/// connected to stderr (see `systemd.exec(5)`).
pub fn connected_to_journal() -> bool {
    let Some(stream) = std::env::var_os("JOURNAL_STREAM") else {
        return false;
    };
    let Some((device, inode)) = stream.to_str().and_then(split_stream) else {
        return false;
    };
    rustix::fs::fstat(std::io::stderr().as_fd())
        .is_ok_and(|stat| stat.st_dev.to_string() == device && stat.st_ino.to_string() == inode)
}

fn split_stream(value: &str) -> Option<(&str, &str)> {
    let (device, inode) = value.trim().split_once(':')?;
    let numeric = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    (numeric(device) && numeric(inode)).then_some((device, inode))
}
