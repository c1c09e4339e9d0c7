use super::*;

fn config(chunk_size: usize, overlap: usize) -> ChunkingConfig {
    ChunkingConfig {
        chunk_size,
        overlap,
    }
}

fn expected_count(len: usize, chunk_size: usize, overlap: usize) -> usize {
    if len == 0 {
        0
    } else if len <= overlap {
        1
    } else {
        (len - overlap).div_ceil(chunk_size - overlap)
    }
}

#[test]
fn empty_text_has_no_chunks() {
    let chunks = chunk_text("", &ChunkingConfig::default()).expect("default config is valid");
    assert_eq!(chunks.len(), 0);
    assert_eq!(chunks.count(), 0);
}

#[test]
fn exact_chunk_size_yields_one_chunk() {
    let text = "a".repeat(800);
    let chunks: Vec<&str> = chunk_text(&text, &ChunkingConfig::default())
        .expect("default config is valid")
        .collect();

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0], text);
}

#[test]
fn one_character_past_the_window_adds_a_chunk() {
    let text = "b".repeat(801);
    let chunks: Vec<&str> = chunk_text(&text, &ChunkingConfig::default())
        .expect("default config is valid")
        .collect();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].len(), 800);
    // second window starts at 650 and is shorter than the chunk size
    assert_eq!(chunks[1].len(), 151);
}

#[test]
fn chunk_count_matches_formula() {
    for (chunk_size, overlap) in [(800, 150), (10, 3), (7, 0), (5, 4)] {
        let cfg = config(chunk_size, overlap);
        for len in 0..=300 {
            let text = "x".repeat(len);
            let chunks = chunk_text(&text, &cfg).expect("config is valid");
            let reported = chunks.len();
            let actual = chunks.count();

            assert_eq!(
                actual,
                expected_count(len, chunk_size, overlap),
                "len={len} chunk_size={chunk_size} overlap={overlap}"
            );
            assert_eq!(reported, actual);
        }
    }
}

#[test]
fn neighbours_share_exactly_the_overlap() {
    let text: String = (0..2000)
        .map(|i| char::from(b'a' + (i % 26) as u8))
        .collect();
    let cfg = config(120, 30);
    let chunks: Vec<&str> = chunk_text(&text, &cfg).expect("config is valid").collect();

    assert!(chunks.len() > 2);
    for (i, pair) in chunks.windows(2).enumerate() {
        let (current, next) = (pair[0], pair[1]);
        assert_eq!(current.len(), 120, "only the last chunk may be short");
        assert_eq!(current[90..], next[..30], "overlap mismatch after chunk {i}");

        let start = i * 90;
        assert_eq!(current, &text[start..start + 120]);
    }
}

#[test]
fn multibyte_text_is_split_on_characters() {
    let text = "é".repeat(25);
    let chunks: Vec<&str> = chunk_text(&text, &config(10, 2)).expect("config is valid").collect();

    assert_eq!(chunks.len(), expected_count(25, 10, 2));
    assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    assert_eq!(chunks[0].chars().count(), 10);
    assert_eq!(chunks[0].len(), 20);
}

#[test]
fn text_shorter_than_overlap_is_a_single_chunk() {
    let chunks: Vec<&str> = chunk_text("short", &ChunkingConfig::default())
        .expect("default config is valid")
        .collect();
    assert_eq!(chunks, vec!["short"]);
}

#[test]
fn iterator_is_restartable_through_clone() {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
    let chunks = chunk_text(&text, &config(100, 20)).expect("config is valid");

    let first: Vec<&str> = chunks.clone().collect();
    let second: Vec<&str> = chunks.collect();
    assert_eq!(first, second);

    let mut partial = chunk_text(&text, &config(100, 20)).expect("config is valid");
    partial.next();
    let snapshot = partial.clone();
    assert_eq!(partial.count(), snapshot.count());
}

#[test]
fn invalid_configurations_are_rejected() {
    assert_eq!(
        chunk_text("abc", &config(0, 0)).err(),
        Some(ChunkingError::ZeroChunkSize)
    );
    assert_eq!(
        chunk_text("abc", &config(100, 100)).err(),
        Some(ChunkingError::OverlapTooLarge {
            overlap: 100,
            chunk_size: 100
        })
    );
    assert!(chunk_text("abc", &config(100, 250)).is_err());
}

#[test]
fn exhausted_iterator_stays_exhausted() {
    let mut chunks = chunk_text("abcdef", &config(4, 1)).expect("config is valid");
    assert_eq!(chunks.next(), Some("abcd"));
    assert_eq!(chunks.next(), Some("def"));
    assert_eq!(chunks.next(), None);
    assert_eq!(chunks.next(), None);
}
