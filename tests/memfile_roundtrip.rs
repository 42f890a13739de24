//! Property tests: whatever the chunking, a memory file gives back what was written

use memclist::memfile::CompressionAlgorithm;
use memclist::{MemFile, MemFileConfig, SeekMode};
use proptest::prelude::*;

const BLOCK: usize = 512;

fn config(algorithm: CompressionAlgorithm) -> MemFileConfig {
    MemFileConfig {
        block_size: BLOCK,
        compression_threshold: 8 * BLOCK,
        compress: true,
        algorithm,
        compression_level: 1,
        min_raw_buffers: 2,
        blocks_per_raw_buffer: 4,
    }
}

fn algorithm() -> impl Strategy<Value = CompressionAlgorithm> {
    prop_oneof![
        Just(CompressionAlgorithm::None),
        Just(CompressionAlgorithm::Zlib),
        Just(CompressionAlgorithm::Zstd),
    ]
}

/// Mostly repetitive bytes with random noise, like a real band list
fn payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop_oneof![3 => Just(b'x'), 1 => any::<u8>()], 0..40_000)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn written_bytes_read_back(
        data in payload(),
        algorithm in algorithm(),
        write_chunks in prop::collection::vec(1usize..3000, 1..16),
        read_chunk in 1usize..5000,
    ) {
        let mut file = MemFile::open("w+", config(algorithm)).unwrap();

        let mut offset = 0;
        let mut chunks = write_chunks.iter().cycle();
        while offset < data.len() {
            let n = (*chunks.next().unwrap()).min(data.len() - offset);
            prop_assert_eq!(file.write(&data[offset..offset + n]), n);
            offset += n;
        }
        prop_assert_eq!(file.len(), data.len() as u64);

        file.rewind(false).unwrap();
        let mut restored = Vec::with_capacity(data.len());
        let mut buf = vec![0u8; read_chunk];
        loop {
            let n = file.read(&mut buf);
            if n == 0 {
                break;
            }
            restored.extend_from_slice(&buf[..n]);
        }
        prop_assert_eq!(file.ferror_code(), 0);
        prop_assert!(restored == data);
    }

    #[test]
    fn seek_then_read_matches(
        data in prop::collection::vec(any::<u8>(), 1..20_000),
        positions in prop::collection::vec(any::<prop::sample::Index>(), 1..20),
    ) {
        let mut file = MemFile::open("w+", config(CompressionAlgorithm::Zlib)).unwrap();
        file.write(&data);

        for position in positions {
            let at = position.index(data.len());
            prop_assert_eq!(file.seek(at as i64, SeekMode::Set).unwrap(), at as u64);
            let mut buf = [0u8; 64];
            let n = file.read(&mut buf);
            let end = (at + 64).min(data.len());
            prop_assert_eq!(n, end - at);
            prop_assert_eq!(&buf[..n], &data[at..end]);
        }
    }
}
