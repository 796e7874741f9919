const DEVICE_MARKER: &str = "=== Device: ";

/// Split `payload` into chunks of at most `max_bytes`, cutting only where a device
/// section starts. Text before the first section stays with it; a single section
/// larger than `max_bytes` becomes its own oversized chunk.
pub fn split_payload(payload: &str, max_bytes: usize) -> Vec<&str> {
    if max_bytes == 0 || payload.len() <= max_bytes {
        return vec![payload];
    }

    let mut cuts: Vec<usize> = payload
        .match_indices(DEVICE_MARKER)
        .map(|(pos, _)| pos)
        .filter(|&pos| pos == 0 || payload.as_bytes()[pos - 1] == b'\n')
        .skip(1)
        .collect();
    cuts.push(payload.len());

    let mut chunks = Vec::new();
    let mut chunk_start = 0;
    let mut seg_start = 0;
    for cut in cuts {
        if cut - chunk_start > max_bytes && seg_start > chunk_start {
            chunks.push(&payload[chunk_start..seg_start]);
            chunk_start = seg_start;
        }
        seg_start = cut;
    }
    if chunk_start < payload.len() {
        chunks.push(&payload[chunk_start..]);
    }
    chunks
}
