//! Simulated chip for engine and facade tests

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::{Mutex, MutexGuard};

use atecc_core::command::Command;
use atecc_core::constants::{config, BLOCK_SIZE, DATA_SLOT_COUNT, WORD_SIZE, ZONE_READ_WRITE_32};
use atecc_core::{packet, Opcode, Response, Status, Zone};
use atecc_transport::{Error, Result, Transport};

/// Chip memory and call counters
pub struct ChipState {
    pub config: [u8; config::ZONE_SIZE],
    pub otp: [u8; config::OTP_ZONE_SIZE],
    pub slots: Vec<Vec<u8>>,
    pub commands: Vec<Command>,
    pub wakes: usize,
    pub idles: usize,
    pub closes: usize,
    pub write_failures: usize,
    pub responses: VecDeque<BytesMut>,
    message: Vec<u8>,
    random: u8,
    pending: Option<BytesMut>,
    closed: bool,
}

impl Default for ChipState {
    fn default() -> Self {
        let mut config = [0u8; config::ZONE_SIZE];
        config[0..4].copy_from_slice(&[0x01, 0x23, 0xA1, 0xB2]);
        config[4..8].copy_from_slice(&[0x00, 0x00, 0x60, 0x03]);
        config[8..13].copy_from_slice(&[0xC3, 0xD4, 0xE5, 0xF6, 0xEE]);
        config[config::LOCK_VALUE_OFFSET] = config::LOCK_UNLOCKED;
        config[config::LOCK_CONFIG_OFFSET] = config::LOCK_UNLOCKED;
        config[config::SLOT_LOCKED_OFFSET] = 0xFF;
        config[config::SLOT_LOCKED_OFFSET + 1] = 0xFF;

        let slots = (0..DATA_SLOT_COUNT)
            .map(|slot| vec![0u8; Zone::Data.size(slot).unwrap_or(0)])
            .collect();

        Self {
            config,
            otp: [0u8; config::OTP_ZONE_SIZE],
            slots,
            commands: Vec::new(),
            wakes: 0,
            idles: 0,
            closes: 0,
            write_failures: 0,
            responses: VecDeque::new(),
            message: Vec::new(),
            random: 0,
            pending: None,
            closed: false,
        }
    }
}

impl ChipState {
    /// Commands of the given opcode, in order
    pub fn sent(&self, opcode: Opcode) -> Vec<&Command> {
        self.commands.iter().filter(|c| c.opcode == opcode).collect()
    }

    fn memory(&mut self, zone: Zone, address: u16) -> (&mut [u8], usize) {
        match zone {
            Zone::Config => (&mut self.config[..], config_offset(address)),
            Zone::Otp => (&mut self.otp[..], config_offset(address)),
            Zone::Data => {
                let slot = usize::from((address >> 3) & 0x1F);
                let offset = usize::from(address >> 8) * BLOCK_SIZE + usize::from(address & 0x07) * WORD_SIZE;
                (&mut self.slots[slot][..], offset)
            }
        }
    }

    fn handle(&mut self, command: &Command) -> BytesMut {
        if let Some(response) = self.responses.pop_front() {
            return response;
        }

        match command.opcode {
            Opcode::Info => Response::frame(&self.config[4..8]),
            Opcode::Read => {
                let Ok(zone) = Zone::try_from(command.param1 & 0x03) else {
                    return Response::status_frame(Status::ParseError);
                };
                let len = access_size(command.param1);
                let (memory, offset) = self.memory(zone, command.param2);
                match memory.get(offset..offset + len) {
                    Some(bytes) => Response::frame(bytes),
                    None => Response::status_frame(Status::ExecutionError),
                }
            }
            Opcode::Write => {
                let Ok(zone) = Zone::try_from(command.param1 & 0x03) else {
                    return Response::status_frame(Status::ParseError);
                };
                if zone == Zone::Config && self.config[config::LOCK_CONFIG_OFFSET] != config::LOCK_UNLOCKED {
                    return Response::status_frame(Status::ExecutionError);
                }
                let len = access_size(command.param1);
                let value = command.payload.slice(..len.min(command.payload.len()));
                let (memory, offset) = self.memory(zone, command.param2);
                match memory.get_mut(offset..offset + len) {
                    Some(bytes) if value.len() == len => {
                        bytes.copy_from_slice(&value);
                        Response::status_frame(Status::Success)
                    }
                    _ => Response::status_frame(Status::ExecutionError),
                }
            }
            Opcode::Lock => {
                match command.param1 & 0x03 {
                    0 => self.config[config::LOCK_CONFIG_OFFSET] = 0x00,
                    1 => self.config[config::LOCK_VALUE_OFFSET] = 0x00,
                    _ => {
                        let slot = (command.param1 >> 2) & 0x0F;
                        let mut bits = u16::from_le_bytes([
                            self.config[config::SLOT_LOCKED_OFFSET],
                            self.config[config::SLOT_LOCKED_OFFSET + 1],
                        ]);
                        bits &= !(1 << slot);
                        self.config[config::SLOT_LOCKED_OFFSET..config::SLOT_LOCKED_OFFSET + 2]
                            .copy_from_slice(&bits.to_le_bytes());
                    }
                }
                Response::status_frame(Status::Success)
            }
            Opcode::Random => {
                self.random = self.random.wrapping_add(1);
                Response::frame(&[self.random; 32])
            }
            Opcode::Nonce => {
                self.message = command.payload.to_vec();
                Response::status_frame(Status::Success)
            }
            Opcode::GenKey => Response::frame(&[command.param2 as u8 + 1; 64]),
            Opcode::Sign => {
                let mut signature = self.message.clone();
                signature.extend_from_slice(&self.message);
                Response::frame(&signature)
            }
            Opcode::Verify => {
                if command.payload.len() >= 32 && command.payload[..32] == self.message[..] {
                    Response::status_frame(Status::Success)
                } else {
                    Response::status_frame(Status::CheckMacVerifyFailed)
                }
            }
            Opcode::UpdateExtra => {
                let offset = match command.param1 {
                    0 => config::USER_EXTRA_OFFSET,
                    _ => config::USER_EXTRA_ADD_OFFSET,
                };
                self.config[offset] = command.param2 as u8;
                Response::status_frame(Status::Success)
            }
            _ => Response::status_frame(Status::ParseError),
        }
    }
}

fn config_offset(address: u16) -> usize {
    usize::from(address >> 3) * BLOCK_SIZE + usize::from(address & 0x07) * WORD_SIZE
}

fn access_size(param1: u8) -> usize {
    if param1 & ZONE_READ_WRITE_32 != 0 {
        BLOCK_SIZE
    } else {
        WORD_SIZE
    }
}

/// Transport backed by an in-memory chip
///
/// Clones share the same chip so a test can inspect it after handing a
/// clone to the device.
#[derive(Clone, Default)]
pub struct FakeChip {
    state: Arc<Mutex<ChipState>>,
}

impl FakeChip {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the chip state for inspection or setup
    pub fn state(&self) -> MutexGuard<'_, ChipState> {
        self.state.lock()
    }

    /// Queue a raw response frame for the next command
    pub fn push_response(&self, frame: BytesMut) {
        self.state().responses.push_back(frame);
    }
}

#[async_trait]
impl Transport for FakeChip {
    async fn wake(&mut self) -> Result<()> {
        let mut state = self.state();
        if state.closed {
            return Err(Error::NotConnected);
        }
        state.wakes += 1;
        Ok(())
    }

    async fn idle(&mut self) -> Result<()> {
        self.state().idles += 1;
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut state = self.state();
        if state.closed {
            return Err(Error::NotConnected);
        }
        if state.write_failures > 0 {
            state.write_failures -= 1;
            return Err(Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "nack")));
        }

        let command = packet::decode(data)?;
        let response = state.handle(&command);
        state.commands.push(command);
        state.pending = Some(response);
        Ok(data.len())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.state();
        let frame = state.pending.take().ok_or(Error::ConnectionClosed)?;
        if frame.len() > buf.len() {
            return Err(Error::ReceiveBufferTooSmall {
                needed: frame.len(),
                capacity: buf.len(),
            });
        }
        buf[..frame.len()].copy_from_slice(&frame);
        Ok(frame.len())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state();
        state.closed = true;
        state.closes += 1;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
