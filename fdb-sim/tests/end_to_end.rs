//! Bring-up through engine sessions on the simulated chip

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use proptest::prelude::*;

use fdb_core::{
    bring_up, DeviceError, EngineBinding, FlashAdapter, FlashDevice, PartitionRegistry,
    RegistryError, SpinLock, StorageConfig, StorageError, WriteGranularity,
};
use fdb_hal::{Database, PartitionDescriptor, PartitionList, RESERVED_STORAGE_TYPE};
use fdb_sim::{parse_config, SimFlash};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const BLOCK: u32 = 4096;

fn device(granularity: WriteGranularity) -> FlashDevice {
    FlashDevice::new("norflash0", 0, 2 * MIB, BLOCK, granularity)
}

fn adapter(granularity: WriteGranularity) -> FlashAdapter<SimFlash> {
    FlashAdapter::new(device(granularity), SimFlash::new(2 * MIB as usize))
}

fn host_table(region_len: u64) -> PartitionList {
    PartitionList::new()
        .with(PartitionDescriptor::new("nvs", 0x01, 0x10_0000, 0x6000))
        .with(PartitionDescriptor::new(
            "fdb",
            RESERVED_STORAGE_TYPE,
            0,
            region_len,
        ))
}

#[test]
fn default_layout_splits_one_mebibyte() {
    let mut adapter = adapter(WriteGranularity::Bits1);
    let mut registry = PartitionRegistry::new();
    let table = bring_up(
        &StorageConfig::default(),
        &mut adapter,
        &host_table(MIB),
        &mut registry,
    )
    .unwrap();

    let layout: Vec<_> = table
        .iter()
        .map(|p| (p.name.as_str(), p.offset, p.length))
        .collect();
    assert_eq!(
        layout,
        vec![("fdb_kvdb1", 0, 524_288), ("fdb_tsdb1", 524_288, 524_288)]
    );
}

#[test]
fn oversized_layout_is_rejected() {
    let mut adapter = adapter(WriteGranularity::Bits1);
    let mut registry = PartitionRegistry::new();
    let config = StorageConfig::new(1, 32, 512 * KIB, 600_000);

    match bring_up(&config, &mut adapter, &host_table(MIB), &mut registry) {
        Err(StorageError::Registry(RegistryError::InsufficientSpace {
            requested,
            available,
            ..
        })) => {
            assert_eq!(requested, 1_124_288);
            assert_eq!(available, 1_048_576);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(registry.table().is_empty());
}

#[test]
fn word_granularity_rejects_odd_write() {
    let mut adapter = adapter(WriteGranularity::Bits32);
    adapter.init().unwrap();
    adapter.erase(0, BLOCK as u64).unwrap();

    assert_eq!(adapter.write(4, &[1, 2, 3]), Err(DeviceError::Misaligned));
    assert_eq!(adapter.write(2, &[1, 2, 3, 4]), Err(DeviceError::Misaligned));
    assert_eq!(adapter.write(4, &[1, 2, 3, 4]), Ok(()));
    assert_eq!(&adapter.chip().bytes()[..8], &[0xFF, 0xFF, 0xFF, 0xFF, 1, 2, 3, 4]);
}

#[test]
fn region_boundary_is_exact() {
    let config = StorageConfig::new(1, 32, 64 * KIB, 32 * KIB);

    let mut registry = PartitionRegistry::new();
    assert!(bring_up(
        &config,
        &mut adapter(WriteGranularity::Bits1),
        &host_table(96 * KIB),
        &mut registry
    )
    .is_ok());

    let mut registry = PartitionRegistry::new();
    assert!(matches!(
        bring_up(
            &config,
            &mut adapter(WriteGranularity::Bits1),
            &host_table(96 * KIB - 1),
            &mut registry
        ),
        Err(StorageError::Registry(RegistryError::InsufficientSpace { .. }))
    ));
}

#[test]
fn chip_init_runs_once() {
    let mut adapter = adapter(WriteGranularity::Bits1);
    adapter.init().unwrap();
    adapter.init().unwrap();

    let mut registry = PartitionRegistry::new();
    bring_up(
        &StorageConfig::default(),
        &mut adapter,
        &host_table(MIB),
        &mut registry,
    )
    .unwrap();

    assert_eq!(adapter.chip().init_calls(), 1);
}

#[test]
fn absent_chip_fails_bring_up() {
    let mut adapter = FlashAdapter::new(device(WriteGranularity::Bits1), SimFlash::absent());
    let mut registry = PartitionRegistry::new();
    assert_eq!(
        bring_up(
            &StorageConfig::default(),
            &mut adapter,
            &host_table(MIB),
            &mut registry
        ),
        Err(StorageError::Device(DeviceError::NotPresent))
    );
    assert!(!registry.is_loaded());
}

#[test]
fn failed_rescan_keeps_previous_table() {
    let mut adapter = adapter(WriteGranularity::Bits1);
    let mut registry = PartitionRegistry::new();
    let committed = bring_up(
        &StorageConfig::default(),
        &mut adapter,
        &host_table(MIB),
        &mut registry,
    )
    .unwrap();

    let bad = StorageConfig::new(1, 32, 512 * KIB, 600_000);
    assert!(registry
        .rescan(&host_table(MIB), &[adapter.device()], &bad)
        .is_err());
    assert_eq!(registry.table(), &committed);
}

#[test]
fn sessions_write_inside_their_partition() {
    let config = StorageConfig::new(8, 32, 8 * KIB, 4 * KIB);
    let mut adapter = adapter(WriteGranularity::Bits8);
    let mut registry = PartitionRegistry::new();
    let table = bring_up(&config, &mut adapter, &host_table(MIB), &mut registry).unwrap();

    let kv_lock = SpinLock::new();
    let ts_lock = SpinLock::new();
    let binding: EngineBinding<NoopRawMutex, _, _, _> =
        EngineBinding::new(adapter, table, config, &kv_lock, &ts_lock).unwrap();

    {
        let kv = binding.session(Database::Kv).unwrap();
        assert!(kv_lock.is_locked());
        assert!(!ts_lock.is_locked());

        let ts = binding.session(Database::Ts).unwrap();
        assert!(ts_lock.is_locked());

        kv.erase(0, 4 * KIB).unwrap();
        kv.write(0, b"key=value").unwrap();
        ts.erase(0, 4 * KIB).unwrap();
        ts.write(0, b"sample").unwrap();

        let mut buf = [0u8; 9];
        kv.read(0, &mut buf).unwrap();
        assert_eq!(&buf, b"key=value");
        assert_eq!(ts.write(4 * KIB - 2, b"xyz"), Err(DeviceError::OutOfRange));
    }
    assert!(!kv_lock.is_locked());
    assert!(!ts_lock.is_locked());

    let chip = binding.into_adapter().into_chip();
    assert_eq!(&chip.bytes()[..9], b"key=value");
    assert_eq!(&chip.bytes()[8192..8198], b"sample");
}

#[test]
fn programming_without_erase_only_clears_bits() {
    let mut adapter = adapter(WriteGranularity::Bits8);
    adapter.init().unwrap();
    adapter.write(0, &[0xF0]).unwrap();
    adapter.write(0, &[0x3C]).unwrap();

    let mut buf = [0u8; 1];
    adapter.read(0, &mut buf).unwrap();
    assert_eq!(buf[0], 0x30);

    adapter.erase(0, BLOCK as u64).unwrap();
    adapter.write(0, &[0x3C]).unwrap();
    adapter.read(0, &mut buf).unwrap();
    assert_eq!(buf[0], 0x3C);
}

#[test]
fn power_loss_mid_write_is_reported() {
    let mut adapter = FlashAdapter::new(
        device(WriteGranularity::Bits8),
        SimFlash::new(2 * MIB as usize).fail_after(5),
    );
    adapter.init().unwrap();

    assert_eq!(
        adapter.write(0, &[0u8; 8]),
        Err(DeviceError::Incomplete { completed: 5 })
    );
    assert_eq!(&adapter.chip().bytes()[..6], &[0, 0, 0, 0, 0, 0xFF]);
}

#[test]
fn operator_file_drives_bring_up() {
    let config = parse_config(
        r#"
        [storage]
        write_granularity_bits = 32
        timestamp_width_bits = 64
        kv_partition_size_bytes = 16384
        ts_partition_size_bytes = 32768
        kv_partition_name = "settings"
        ts_partition_name = "telemetry"
        "#,
    )
    .unwrap();

    let mut adapter = adapter(WriteGranularity::Bits32);
    let mut registry = PartitionRegistry::new();
    let table = bring_up(&config, &mut adapter, &host_table(MIB), &mut registry).unwrap();

    assert_eq!(table.find("settings").map(|p| p.length), Some(16_384));
    assert_eq!(table.find("telemetry").map(|p| p.offset), Some(16_384));
}

proptest! {
    #[test]
    fn layout_fits_iff_region_is_large_enough(
        kv_blocks in 0u64..64,
        ts_blocks in 0u64..64,
        region in 1u64..(128 * BLOCK as u64),
    ) {
        let kv = kv_blocks * BLOCK as u64;
        let ts = ts_blocks * BLOCK as u64;
        let config = StorageConfig::new(1, 32, kv, ts);
        let mut registry = PartitionRegistry::new();
        let result = bring_up(
            &config,
            &mut adapter(WriteGranularity::Bits1),
            &host_table(region),
            &mut registry,
        );

        if kv + ts <= region {
            let table = result.unwrap();
            prop_assert_eq!(table.iter().map(|p| p.length).sum::<u64>(), kv + ts);
            for pair in table.as_slice().windows(2) {
                prop_assert_eq!(pair[0].end(), pair[1].offset);
                prop_assert!(pair[1].end() <= region);
            }
        } else {
            let is_insufficient = matches!(
                result,
                Err(StorageError::Registry(RegistryError::InsufficientSpace { .. }))
            );
            prop_assert!(is_insufficient);
        }
    }
}
