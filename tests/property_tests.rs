use ctxmix::entropy_coding::{
    io::{ACReader, ACWriter},
    ArithmeticCoder,
};
use ctxmix::logistic::{squash, stretch};
use ctxmix::mixers::{LogisticMixer, Mixer};
use ctxmix::runner::HEADER_SIZE;
use ctxmix::{compress, decompress, unroll_for, Config, Predictor};
use proptest::prelude::*;

fn config_strategy() -> impl Strategy<Value = Config> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(run_stats, byte_history, dmc, sparse)| Config {
        level: 0,
        run_stats,
        byte_history,
        dmc,
        sparse,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn roundtrip(input in prop::collection::vec(any::<u8>(), 0..400), config in config_strategy()) {
        let archive = compress(&input, &config).unwrap();
        prop_assert_eq!(decompress(&archive).unwrap(), input);
    }

    #[test]
    fn deterministic(input in prop::collection::vec(any::<u8>(), 0..200)) {
        let config = Config::with_level(0).unwrap();
        prop_assert_eq!(compress(&input, &config).unwrap(), compress(&input, &config).unwrap());
    }

    #[test]
    fn predictions_stay_in_bounds(input in prop::collection::vec(prop_oneof![Just(0u8), Just(255u8), any::<u8>()], 1..200)) {
        let mut predictor = Predictor::new(&Config::with_level(0).unwrap()).unwrap();
        for byte in input {
            unroll_for!(bit in byte, {
                prop_assert!((1..=4094).contains(&predictor.p()));
                predictor.update(bit);
            });
        }
    }
}

proptest! {
    #[test]
    fn coder_roundtrip(bits in prop::collection::vec((0u8..2, 1u16..4095), 0..2000)) {
        let mut ac = ArithmeticCoder::new_coder(ACWriter::new(Vec::new()));
        for &(bit, p) in &bits {
            ac.encode(bit, p).unwrap();
        }
        ac.flush().unwrap();
        let archive = ac.into_inner().into_inner();

        let mut ac = ArithmeticCoder::new_decoder(ACReader::new(archive.as_slice())).unwrap();
        for &(bit, p) in &bits {
            prop_assert_eq!(ac.decode(p).unwrap(), bit);
        }
    }

    #[test]
    fn mixer_output_is_a_probability(steps in prop::collection::vec((prop::collection::vec(-2047i32..=2047, 3), 0u32..4, 0u8..2), 1..300)) {
        let mut mixer = LogisticMixer::new(3, 4 + 8, 2);
        for (i, (inputs, ctx, bit)) in steps.into_iter().enumerate() {
            for x in inputs {
                mixer.add(x);
            }
            mixer.set(ctx, 4);
            mixer.set(i as u32 % 8, 8);
            prop_assert!((1..=4095).contains(&mixer.p()));
            mixer.update(bit);
        }
    }

    #[test]
    fn stretch_inverts_squash(p in 1i32..4095) {
        let x = stretch(p);
        prop_assert!(squash(x - 1) < p && p <= squash(x));
    }
}

#[test]
fn alternating_bytes_shrink() {
    let data: Vec<u8> = (0..1000).map(|i| if i % 2 == 0 { 0x00 } else { 0xff }).collect();
    let archive = compress(&data, &Config::with_level(1).unwrap()).unwrap();
    assert!(archive.len() < data.len() / 4, "{}", archive.len());
    assert_eq!(decompress(&archive).unwrap(), data);
}

#[test]
fn single_byte_has_constant_overhead() {
    let archive = compress(&[0x41], &Config::with_level(1).unwrap()).unwrap();
    assert!(archive.len() <= HEADER_SIZE + 3);
    assert_eq!(decompress(&archive).unwrap(), [0x41]);
}
