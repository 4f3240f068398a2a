//! Protocol translation accounting
//!
//! When a packet crosses from one protocol to the other it is re-framed for the
//! target lane and its size is adjusted for the difference in link overhead and
//! maximum payload. A large-protocol payload re-framed for the small protocol
//! occupies the channel several times; that cost is modelled by transmitting
//! size-identical copies, never by splitting the content.

/// Size of the translated packet:
/// `size + (target_overhead - source_overhead) + (target_max - source_max)`.
///
/// Returns `None` when the result would be negative.
pub fn translated_size(
    size: usize,
    source_overhead: usize,
    target_overhead: usize,
    source_max_payload: usize,
    target_max_payload: usize,
) -> Option<usize> {
    let grown = size
        .checked_add(target_overhead)?
        .checked_add(target_max_payload)?;
    grown
        .checked_sub(source_overhead)?
        .checked_sub(source_max_payload)
}

/// Number of extra copies sent after the primary translated packet.
///
/// `source_max / target_max`, one fewer when it divides exactly. A zero target
/// payload yields no copies.
pub fn fragment_count(source_max_payload: usize, target_max_payload: usize) -> usize {
    if target_max_payload == 0 {
        return 0;
    }
    let count = source_max_payload / target_max_payload;
    if source_max_payload % target_max_payload == 0 {
        count.saturating_sub(1)
    } else {
        count
    }
}
