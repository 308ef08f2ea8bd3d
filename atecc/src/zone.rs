//! Zone access on top of the execution engine
//!
//! The chip only reads and writes whole words (4 bytes) or blocks
//! (32 bytes). Byte ranges are split into block accesses where possible and
//! word accesses elsewhere.

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use atecc_core::command::Command;
use atecc_core::constants::{config, BLOCK_SIZE, WORDS_PER_BLOCK, WORD_SIZE};
use atecc_core::zone::address;
use atecc_core::{Error as CoreError, Zone};

use crate::engine::Engine;
use crate::error::{Error, Result};

/// Position of the next access within a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    block: usize,
    word: usize,
}

impl Cursor {
    fn at(offset: usize) -> Self {
        Self {
            block: offset / BLOCK_SIZE,
            word: (offset % BLOCK_SIZE) / WORD_SIZE,
        }
    }

    /// Byte offset of the cursor within the zone
    fn offset(&self) -> usize {
        self.block * BLOCK_SIZE + self.word * WORD_SIZE
    }

    fn next_block(&mut self) {
        self.block += 1;
        self.word = 0;
    }

    fn next_word(&mut self) {
        self.word += 1;
        if self.word == WORDS_PER_BLOCK {
            self.next_block();
        }
    }
}

fn check_range(zone: Zone, offset: usize, length: usize, size: usize) -> Result<()> {
    if offset.checked_add(length).is_none_or(|end| end > size) {
        return Err(CoreError::OutOfRange {
            zone,
            offset,
            length,
            size,
        }
        .into());
    }
    Ok(())
}

fn check_access_size(len: usize) -> Result<()> {
    if len != BLOCK_SIZE && len != WORD_SIZE {
        return Err(CoreError::InvalidAccessSize(len).into());
    }
    Ok(())
}

impl Engine {
    /// Read one word or block
    ///
    /// `data` must be 4 or 32 bytes long; `offset` is the word index within
    /// the block.
    pub async fn read_zone(
        &mut self,
        zone: Zone,
        slot: u16,
        block: u8,
        offset: u8,
        data: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        check_access_size(data.len())?;
        zone.size(slot)?;

        let addr = address(zone, slot, block, offset);
        let command = Command::read(zone, addr, data.len() == BLOCK_SIZE);

        let n = self.execute(&command, data, cancel).await?;
        if n != data.len() {
            return Err(Error::UnexpectedResponseSize {
                expected: data.len(),
                actual: n,
            });
        }
        Ok(n)
    }

    /// Write one word or block
    pub async fn write_zone(
        &mut self,
        zone: Zone,
        slot: u16,
        block: u8,
        offset: u8,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_access_size(data.len())?;
        zone.size(slot)?;

        let addr = address(zone, slot, block, offset);
        let command = Command::write(zone, addr, data, None)?;
        self.run(&command, cancel).await
    }

    /// Read an arbitrary byte range
    ///
    /// Full blocks are read while the zone has at least a block left past
    /// the cursor; the tail of the zone is read word by word. An empty
    /// `data` succeeds without touching the chip.
    pub async fn read_bytes_zone(
        &mut self,
        zone: Zone,
        slot: u16,
        offset: usize,
        data: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        let size = zone.size(slot)?;
        check_range(zone, offset, data.len(), size)?;

        let mut buf = [0u8; BLOCK_SIZE];
        let mut cursor = Cursor::at(offset);
        cursor.word = 0;
        let mut word_mode = false;
        let mut done = 0;

        while done < data.len() {
            if !word_mode && size - cursor.block * BLOCK_SIZE < BLOCK_SIZE {
                word_mode = true;
                cursor.word = ((offset + done) / WORD_SIZE) % WORDS_PER_BLOCK;
            }

            let chunk = if word_mode { WORD_SIZE } else { BLOCK_SIZE };
            let n = self
                .read_zone(
                    zone,
                    slot,
                    cursor.block as u8,
                    cursor.word as u8,
                    &mut buf[..chunk],
                    cancel,
                )
                .await?;

            let skip = (offset + done).saturating_sub(cursor.offset());
            let count = n.saturating_sub(skip).min(data.len() - done);
            data[done..done + count].copy_from_slice(&buf[skip..skip + count]);
            done += count;
            trace!("Read {} bytes of {} from {} zone", done, data.len(), zone);

            if word_mode {
                cursor.next_word();
            } else {
                cursor.next_block();
            }
        }

        Ok(done)
    }

    /// Write an arbitrary word-aligned byte range
    ///
    /// Blocks are written when the cursor is block-aligned and a full block
    /// of input remains, words otherwise. In the config zone block 2 is
    /// always written word by word and its word 5 (UserExtra, UserExtraAdd,
    /// LockValue, LockConfig) is skipped; those bytes are only changed by
    /// UpdateExtra and Lock.
    ///
    /// Returns the number of input bytes consumed, skipped word included.
    pub async fn write_bytes_zone(
        &mut self,
        zone: Zone,
        slot: u16,
        offset: usize,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let size = zone.size(slot)?;

        if data.is_empty() {
            return Ok(0);
        }
        if offset % WORD_SIZE != 0 {
            return Err(CoreError::MisalignedOffset {
                offset,
                alignment: WORD_SIZE,
            }
            .into());
        }
        if data.len() % WORD_SIZE != 0 {
            return Err(CoreError::MisalignedLength {
                length: data.len(),
                alignment: WORD_SIZE,
            }
            .into());
        }
        check_range(zone, offset, data.len(), size)?;

        let mut cursor = Cursor::at(offset);
        let mut index = 0;

        while index < data.len() {
            let in_lock_block = zone == Zone::Config && cursor.block == usize::from(config::LOCK_BLOCK);
            let in_lock_word = in_lock_block && cursor.word == usize::from(config::LOCK_WORD);

            let remaining = data.len() - index;
            if cursor.word == 0 && remaining >= BLOCK_SIZE && !in_lock_block {
                self.write_zone(
                    zone,
                    slot,
                    cursor.block as u8,
                    0,
                    &data[index..index + BLOCK_SIZE],
                    cancel,
                )
                .await?;
                index += BLOCK_SIZE;
                cursor.next_block();
            } else {
                if in_lock_word {
                    debug!("Skipping lock word at config offset {}", cursor.offset());
                } else {
                    self.write_zone(
                        zone,
                        slot,
                        cursor.block as u8,
                        cursor.word as u8,
                        &data[index..index + WORD_SIZE],
                        cancel,
                    )
                    .await?;
                }
                index += WORD_SIZE;
                cursor.next_word();
            }
        }

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use crate::testing::FakeChip;
    use atecc_core::constants::ZONE_READ_WRITE_32;
    use atecc_core::Opcode;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn engine(chip: &FakeChip) -> Engine {
        Engine::new(Box::new(chip.clone()), DeviceConfig::kit_default())
    }

    /// (block, word, is_block) of every write sent
    fn writes(chip: &FakeChip) -> Vec<(u16, u16, bool)> {
        chip.state()
            .sent(Opcode::Write)
            .iter()
            .map(|c| (c.param2 >> 3, c.param2 & 0x07, c.param1 & ZONE_READ_WRITE_32 != 0))
            .collect()
    }

    #[test]
    fn test_cursor() {
        let mut cursor = Cursor::at(84);
        assert_eq!(cursor, Cursor { block: 2, word: 5 });
        assert_eq!(cursor.offset(), 84);

        cursor.next_word();
        cursor.next_word();
        assert_eq!(cursor, Cursor { block: 2, word: 7 });
        cursor.next_word();
        assert_eq!(cursor, Cursor { block: 3, word: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_bytes_zone_empty() {
        let chip = FakeChip::new();
        let mut engine = engine(&chip);

        let n = engine
            .read_bytes_zone(Zone::Config, 0, 0, &mut [], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(n, 0);

        let state = chip.state();
        assert_eq!(state.wakes, 0);
        assert!(state.commands.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_bytes_zone_range_checks() {
        let chip = FakeChip::new();
        let mut engine = engine(&chip);
        let cancel = CancellationToken::new();

        let err = engine
            .read_bytes_zone(Zone::Config, 0, 120, &mut [0u8; 16], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Core(CoreError::OutOfRange { offset: 120, length: 16, size: 128, .. })
        ));
        assert!(chip.state().commands.is_empty());

        let n = engine
            .read_bytes_zone(Zone::Config, 0, 96, &mut [0u8; 32], &cancel)
            .await
            .unwrap();
        assert_eq!(n, 32);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bytes_zone_offset_overflow() {
        let chip = FakeChip::new();
        let mut engine = engine(&chip);
        let cancel = CancellationToken::new();

        let err = engine
            .read_bytes_zone(Zone::Config, 0, usize::MAX, &mut [0u8; 4], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Core(CoreError::OutOfRange { offset: usize::MAX, length: 4, .. })
        ));

        let err = engine
            .write_bytes_zone(Zone::Config, 0, usize::MAX - 3, &[0u8; 4], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Core(CoreError::OutOfRange { length: 4, .. })));

        assert!(chip.state().commands.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_bytes_zone_unaligned() {
        let chip = FakeChip::new();
        for (i, b) in chip.state().config.iter_mut().enumerate() {
            *b = i as u8;
        }
        let mut engine = engine(&chip);

        let mut data = [0u8; 40];
        let n = engine
            .read_bytes_zone(Zone::Config, 0, 30, &mut data, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(n, 40);
        let expected: Vec<u8> = (30..70).collect();
        assert_eq!(data.to_vec(), expected);

        // Blocks 0, 1 and 2 cover bytes 30..70
        let state = chip.state();
        let reads = state.sent(Opcode::Read);
        assert_eq!(reads.len(), 3);
        assert!(reads.iter().all(|c| c.param1 & ZONE_READ_WRITE_32 != 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_bytes_zone_data_slot_tail() {
        let chip = FakeChip::new();
        for (i, b) in chip.state().slots[3].iter_mut().enumerate() {
            *b = 0x80 + i as u8;
        }
        let mut engine = engine(&chip);

        let mut data = [0u8; 36];
        engine
            .read_bytes_zone(Zone::Data, 3, 0, &mut data, &CancellationToken::new())
            .await
            .unwrap();

        let expected: Vec<u8> = (0..36).map(|i| 0x80 + i as u8).collect();
        assert_eq!(data.to_vec(), expected);

        // One block read, then the remaining word of block 1
        let state = chip.state();
        let reads = state.sent(Opcode::Read);
        assert_eq!(reads.len(), 2);
        assert_eq!(reads[0].param2, 3 << 3);
        assert_eq!(reads[1].param2, (1 << 8) | (3 << 3));
        assert_eq!(reads[1].param1 & ZONE_READ_WRITE_32, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_bytes_zone_uses_slot_size() {
        let chip = FakeChip::new();
        let mut engine = engine(&chip);
        let cancel = CancellationToken::new();

        // Slot 8 is 416 bytes, past anything slot 0 could hold
        let n = engine
            .read_bytes_zone(Zone::Data, 8, 384, &mut [0u8; 32], &cancel)
            .await
            .unwrap();
        assert_eq!(n, 32);

        assert!(engine
            .read_bytes_zone(Zone::Data, 16, 0, &mut [0u8; 4], &cancel)
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_zone_access_size() {
        let chip = FakeChip::new();
        let mut engine = engine(&chip);

        let err = engine
            .read_zone(Zone::Config, 0, 0, 0, &mut [0u8; 8], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Core(CoreError::InvalidAccessSize(8))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_bytes_zone_skips_lock_word() {
        let chip = FakeChip::new();
        let mut engine = engine(&chip);

        let data: Vec<u8> = (0..64).collect();
        let n = engine
            .write_bytes_zone(Zone::Config, 0, 64, &data, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(n, 64);

        let mut expected: Vec<(u16, u16, bool)> = (0..8)
            .filter(|&w| w != 5)
            .map(|w| (2, w, false))
            .collect();
        expected.push((3, 0, true));
        assert_eq!(writes(&chip), expected);

        let state = chip.state();
        assert_eq!(&state.config[64..84], &data[..20]);
        assert_eq!(&state.config[84..88], &[0x00, 0x00, 0x55, 0x55]);
        assert_eq!(&state.config[88..128], &data[24..]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_bytes_zone_full_config() {
        let chip = FakeChip::new();
        let mut engine = engine(&chip);

        let data = [0xA5u8; 112];
        let n = engine
            .write_bytes_zone(Zone::Config, 0, 16, &data, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(n, 112);

        let mut expected = vec![(0, 4, false), (0, 5, false), (0, 6, false), (0, 7, false)];
        expected.push((1, 0, true));
        expected.extend((0..8).filter(|&w| w != 5).map(|w| (2, w, false)));
        expected.push((3, 0, true));
        assert_eq!(writes(&chip), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_bytes_zone_data_blocks() {
        let chip = FakeChip::new();
        let mut engine = engine(&chip);

        let data = [0x11u8; 72];
        let n = engine
            .write_bytes_zone(Zone::Data, 9, 0, &data, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(n, 72);

        let state = chip.state();
        let sent = state.sent(Opcode::Write);
        let addresses: Vec<u16> = sent.iter().map(|c| c.param2).collect();
        assert_eq!(
            addresses,
            vec![9 << 3, (1 << 8) | (9 << 3), (2 << 8) | (9 << 3), (2 << 8) | (9 << 3) | 1]
        );
        assert_eq!(state.slots[9], vec![0x11u8; 72]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_bytes_zone_validation() {
        let chip = FakeChip::new();
        let mut engine = engine(&chip);
        let cancel = CancellationToken::new();

        assert!(matches!(
            engine.write_bytes_zone(Zone::Data, 16, 0, &[0u8; 4], &cancel).await,
            Err(Error::Core(CoreError::InvalidSlot { slot: 16, .. }))
        ));
        assert_eq!(
            engine.write_bytes_zone(Zone::Config, 0, 16, &[], &cancel).await.unwrap(),
            0
        );
        assert!(matches!(
            engine.write_bytes_zone(Zone::Config, 0, 18, &[0u8; 4], &cancel).await,
            Err(Error::Core(CoreError::MisalignedOffset { offset: 18, .. }))
        ));
        assert!(matches!(
            engine.write_bytes_zone(Zone::Config, 0, 16, &[0u8; 6], &cancel).await,
            Err(Error::Core(CoreError::MisalignedLength { length: 6, .. }))
        ));
        assert!(matches!(
            engine.write_bytes_zone(Zone::Otp, 0, 48, &[0u8; 32], &cancel).await,
            Err(Error::Core(CoreError::OutOfRange { .. }))
        ));

        assert!(chip.state().commands.is_empty());
    }

    proptest! {
        #[test]
        fn prop_read_bytes_zone_matches_memory(offset in 0usize..128, len in 0usize..=128) {
            let len = len.min(128 - offset);

            let chip = FakeChip::new();
            for (i, b) in chip.state().config.iter_mut().enumerate() {
                *b = (i as u8).wrapping_mul(7);
            }
            let expected = chip.state().config[offset..offset + len].to_vec();

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            let data = runtime.block_on(async {
                let mut engine = engine(&chip);
                let mut data = vec![0u8; len];
                let n = engine
                    .read_bytes_zone(Zone::Config, 0, offset, &mut data, &CancellationToken::new())
                    .await
                    .unwrap();
                assert_eq!(n, len);
                data
            });

            prop_assert_eq!(data, expected);
        }
    }
}
