use std::time::Duration;

use crate::eeprom::{ChipProfile, LinkSettings, TransferOptions};
use crate::image::record::{
    BASE_MODEL_PN, BASE_MODEL_REV, CONFIGURATION_VERSION, END_MODEL_PN, END_MODEL_REV, SAAB_PN,
    SUPPLIER_PN, VIN,
};

/// VIN stored in [`sample_image`]. Model year '8'.
pub const SAMPLE_VIN: &str = "YS3FD49Y881012345";

/// A 512-byte CIM image with every decoded field populated.
pub fn sample_image() -> Vec<u8> {
    let mut image: Vec<u8> = (0..512u32).map(|i| (i as u8).wrapping_mul(7) ^ 0x3C).collect();

    image[END_MODEL_PN].copy_from_slice(&12_788_764u32.to_be_bytes());
    image[END_MODEL_REV].copy_from_slice(b"AB");
    image[BASE_MODEL_PN].copy_from_slice(&12_805_452u32.to_be_bytes());
    image[BASE_MODEL_REV].copy_from_slice(b"AA");
    image[VIN].copy_from_slice(SAMPLE_VIN.as_bytes());
    image[SUPPLIER_PN].copy_from_slice(&28_140_419u32.to_be_bytes());
    image[SAAB_PN].copy_from_slice(&12_800_409u32.to_be_bytes());
    image[CONFIGURATION_VERSION].copy_from_slice(&14u32.to_be_bytes());
    image
}

/// Default 93C66 profile on the simulated port.
pub fn sample_profile() -> ChipProfile {
    ChipProfile::builder("SIM")
        .build()
        .expect("default profile is valid")
}

/// Engine options with no pacing and short timeouts.
pub fn fast_options() -> TransferOptions {
    TransferOptions {
        chunk_size: 1,
        read_delay: Duration::ZERO,
        write_delay: Duration::ZERO,
        ack_timeout: Duration::from_millis(100),
        erase_timeout: Duration::from_millis(200),
        link: LinkSettings {
            settle_delay: Duration::ZERO,
            ..LinkSettings::default()
        },
    }
}

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
