//! Ledger wire format for native transfers.
//!
//! # Message
//!
//! ```text
//! header          3 bytes: required signatures, readonly signed, readonly unsigned
//! account keys    compact-u16 count, then 32 bytes each
//! blockhash       32 bytes
//! instructions    compact-u16 count, then for each:
//!                   program index (1), compact-u16 + account indices, compact-u16 + data
//! ```
//!
//! # Transaction
//!
//! ```text
//! compact-u16 signature count, 64 bytes per signature, message
//! ```
//!
//! A transfer is the system program's instruction 2: `u32 LE 2 || u64 LE lamports`.

use qwallet_core::constants::{BLOCKHASH_SIZE, LEDGER_SIGNATURE_SIZE, MAX_TRANSACTION_SIZE};
use qwallet_core::error::{Result, WalletError};
use qwallet_core::types::{Amount, LedgerAddress};

/// System program id (all zeroes).
pub const SYSTEM_PROGRAM: LedgerAddress = LedgerAddress::from_array([0u8; 32]);

const TRANSFER_INSTRUCTION: u32 = 2;

// ═══════════════════════════════════════════════════════════════════════════════
// COMPACT-U16
// ═══════════════════════════════════════════════════════════════════════════════

/// Appends a compact-u16 length (7 bits per byte, high bit = continue).
pub fn encode_len(out: &mut Vec<u8>, len: usize) -> Result<()> {
    let mut rem = u16::try_from(len)
        .map_err(|_| WalletError::invalid(format!("length {len} exceeds compact-u16")))?;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            return Ok(());
        }
        byte |= 0x80;
        out.push(byte);
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| WalletError::invalid("truncated transaction"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Strict compact-u16: at most 3 bytes, minimal, no value above `u16::MAX`.
    fn len(&mut self) -> Result<usize> {
        let mut value = 0usize;
        for i in 0..3 {
            let byte = self.u8()?;
            if i > 0 && byte == 0 {
                return Err(WalletError::invalid("non-minimal compact-u16"));
            }
            // The third byte carries only the top 2 bits
            if i == 2 && byte > 0x03 {
                return Err(WalletError::invalid("compact-u16 overflow"));
            }
            value |= usize::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(WalletError::invalid("compact-u16 overflow"))
    }

    fn finish(&self) -> Result<()> {
        if self.pos != self.bytes.len() {
            return Err(WalletError::invalid("trailing bytes after transaction"));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MESSAGE
// ═══════════════════════════════════════════════════════════════════════════════

/// One compiled instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledInstruction {
    /// Index of the program in the account keys
    pub program_index: u8,
    /// Indices of the instruction's accounts
    pub accounts: Vec<u8>,
    /// Instruction data
    pub data: Vec<u8>,
}

/// Unsigned transaction body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Signatures the message requires
    pub num_required_signatures: u8,
    /// Signed accounts that are read-only
    pub num_readonly_signed: u8,
    /// Unsigned accounts that are read-only
    pub num_readonly_unsigned: u8,
    /// Account keys, signers first
    pub account_keys: Vec<LedgerAddress>,
    /// Recent blockhash
    pub recent_blockhash: [u8; BLOCKHASH_SIZE],
    /// Instructions
    pub instructions: Vec<CompiledInstruction>,
}

/// A decoded native transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// Paying account
    pub from: LedgerAddress,
    /// Receiving account
    pub to: LedgerAddress,
    /// Amount moved
    pub amount: Amount,
}

impl Message {
    /// A single system transfer paid and signed by `from`.
    pub fn transfer(
        from: LedgerAddress,
        to: LedgerAddress,
        amount: Amount,
        recent_blockhash: [u8; BLOCKHASH_SIZE],
    ) -> Self {
        let mut data = Vec::with_capacity(12);
        data.extend_from_slice(&TRANSFER_INSTRUCTION.to_le_bytes());
        data.extend_from_slice(&amount.lamports().to_le_bytes());

        let (account_keys, accounts) = if from == to {
            (vec![from, SYSTEM_PROGRAM], vec![0, 0])
        } else {
            (vec![from, to, SYSTEM_PROGRAM], vec![0, 1])
        };
        let program_index = (account_keys.len() - 1) as u8;

        Self {
            num_required_signatures: 1,
            num_readonly_signed: 0,
            num_readonly_unsigned: 1,
            account_keys,
            recent_blockhash,
            instructions: vec![CompiledInstruction {
                program_index,
                accounts,
                data,
            }],
        }
    }

    /// Canonical byte encoding; this is what gets signed.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(128);
        out.push(self.num_required_signatures);
        out.push(self.num_readonly_signed);
        out.push(self.num_readonly_unsigned);

        encode_len(&mut out, self.account_keys.len())?;
        for key in &self.account_keys {
            out.extend_from_slice(key.as_bytes());
        }
        out.extend_from_slice(&self.recent_blockhash);

        encode_len(&mut out, self.instructions.len())?;
        for ix in &self.instructions {
            out.push(ix.program_index);
            encode_len(&mut out, ix.accounts.len())?;
            out.extend_from_slice(&ix.accounts);
            encode_len(&mut out, ix.data.len())?;
            out.extend_from_slice(&ix.data);
        }
        Ok(out)
    }

    fn read(r: &mut Reader<'_>) -> Result<Self> {
        let num_required_signatures = r.u8()?;
        let num_readonly_signed = r.u8()?;
        let num_readonly_unsigned = r.u8()?;

        let key_count = r.len()?;
        let mut account_keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            account_keys.push(LedgerAddress::from_array(r.array()?));
        }
        let recent_blockhash = r.array()?;

        let ix_count = r.len()?;
        let mut instructions = Vec::with_capacity(ix_count);
        for _ in 0..ix_count {
            let program_index = r.u8()?;
            let n = r.len()?;
            let accounts = r.take(n)?.to_vec();
            let n = r.len()?;
            let data = r.take(n)?.to_vec();
            instructions.push(CompiledInstruction {
                program_index,
                accounts,
                data,
            });
        }

        Ok(Self {
            num_required_signatures,
            num_readonly_signed,
            num_readonly_unsigned,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }

    /// Fee payer (first signer).
    pub fn fee_payer(&self) -> Option<&LedgerAddress> {
        self.account_keys.first()
    }

    /// The message's transfer, if it is exactly one system transfer.
    pub fn as_transfer(&self) -> Option<Transfer> {
        let [ix] = self.instructions.as_slice() else {
            return None;
        };
        let program = self.account_keys.get(usize::from(ix.program_index))?;
        if *program != SYSTEM_PROGRAM || ix.data.len() != 12 || ix.accounts.len() != 2 {
            return None;
        }
        let kind = u32::from_le_bytes(ix.data[..4].try_into().ok()?);
        if kind != TRANSFER_INSTRUCTION {
            return None;
        }
        let lamports = u64::from_le_bytes(ix.data[4..].try_into().ok()?);
        Some(Transfer {
            from: *self.account_keys.get(usize::from(ix.accounts[0]))?,
            to: *self.account_keys.get(usize::from(ix.accounts[1]))?,
            amount: Amount::from_lamports(lamports),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Signature slots plus message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// One slot per required signer
    pub signatures: Vec<[u8; LEDGER_SIGNATURE_SIZE]>,
    /// Signed message
    pub message: Message,
}

impl Transaction {
    /// Wire encoding.
    ///
    /// # Errors
    /// `InvalidParameters` if the encoding exceeds the ledger's packet size
    /// or the slot count does not match the header.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        if self.signatures.len() != usize::from(self.message.num_required_signatures) {
            return Err(WalletError::invalid(format!(
                "message requires {} signatures, got {}",
                self.message.num_required_signatures,
                self.signatures.len()
            )));
        }
        let mut out = Vec::with_capacity(256);
        encode_len(&mut out, self.signatures.len())?;
        for sig in &self.signatures {
            out.extend_from_slice(sig);
        }
        out.extend_from_slice(&self.message.serialize()?);

        if out.len() > MAX_TRANSACTION_SIZE {
            return Err(WalletError::invalid(format!(
                "transaction is {} bytes, limit is {MAX_TRANSACTION_SIZE}",
                out.len()
            )));
        }
        Ok(out)
    }

    /// Parses the wire encoding.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let count = r.len()?;
        let mut signatures = Vec::with_capacity(count);
        for _ in 0..count {
            signatures.push(r.array()?);
        }
        let message = Message::read(&mut r)?;
        r.finish()?;
        Ok(Self {
            signatures,
            message,
        })
    }

    /// Ledger identifier: base58 of the first signature slot.
    pub fn id(&self) -> Option<String> {
        self.signatures
            .first()
            .map(|sig| bs58::encode(sig).into_string())
    }
}
