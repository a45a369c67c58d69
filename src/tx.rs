//! Transactions: `TxIn`, `TxOut`, and the `Tx` container, plus scriptSig /
//! scriptPubKey combination and the fee calculation that needs previous
//! outputs fetched from elsewhere.
//!
//! Grounded on `modified_src/tx.py`'s `Tx`, `TxIn`, and `TxOut` classes.

use crate::error::{Error, Result};
use crate::hash::{encode_varint, hash256, read_varint, take_bytes};
use crate::script::Script;

/// A transaction input: a reference to a previous output, its unlocking
/// script, and its sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    prev_tx: [u8; 32],
    prev_index: u32,
    script_sig: Script,
    sequence: u32,
}

impl TxIn {
    /// Builds an input from its previous-transaction id (natural, big-endian
    /// display order), output index, unlocking script, and sequence number.
    pub fn new(prev_tx: [u8; 32], prev_index: u32, script_sig: Script, sequence: u32) -> Self {
        TxIn {
            prev_tx,
            prev_index,
            script_sig,
            sequence,
        }
    }

    /// The referenced transaction's id, in natural (big-endian) order.
    pub fn prev_tx(&self) -> &[u8; 32] {
        &self.prev_tx
    }

    /// The referenced output's index within that transaction.
    pub fn prev_index(&self) -> u32 {
        self.prev_index
    }

    /// The unlocking script (scriptSig).
    pub fn script_sig(&self) -> &Script {
        &self.script_sig
    }

    /// Replaces the unlocking script, used while building a signature hash
    /// with the previous scriptPubKey substituted in.
    pub fn with_script_sig(&self, script_sig: Script) -> Self {
        TxIn {
            script_sig,
            ..self.clone()
        }
    }

    /// `nSequence`.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut reversed = self.prev_tx;
        reversed.reverse();
        out.extend_from_slice(&reversed);
        out.extend_from_slice(&self.prev_index.to_le_bytes());
        out.extend(self.script_sig.serialize());
        out.extend_from_slice(&self.sequence.to_le_bytes());
        out
    }

    fn deserialize(cursor: &mut &[u8]) -> Result<Self> {
        let mut prev_tx: [u8; 32] = take_bytes(cursor, 32)?.try_into().expect("took exactly 32 bytes");
        prev_tx.reverse();
        let prev_index = u32::from_le_bytes(take_bytes(cursor, 4)?.try_into().unwrap());
        let script_sig = Script::deserialize(cursor)?;
        let sequence = u32::from_le_bytes(take_bytes(cursor, 4)?.try_into().unwrap());
        Ok(TxIn {
            prev_tx,
            prev_index,
            script_sig,
            sequence,
        })
    }
}

/// A transaction output: an amount in satoshis and a locking script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    amount: u64,
    script_pubkey: Script,
}

impl TxOut {
    /// Builds an output from its amount (in satoshis) and locking script.
    pub fn new(amount: u64, script_pubkey: Script) -> Self {
        TxOut { amount, script_pubkey }
    }

    /// The amount, in satoshis.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// The locking script (scriptPubKey).
    pub fn script_pubkey(&self) -> &Script {
        &self.script_pubkey
    }

    fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.amount.to_le_bytes());
        out.extend(self.script_pubkey.serialize());
        out
    }

    fn deserialize(cursor: &mut &[u8]) -> Result<Self> {
        let amount = u64::from_le_bytes(take_bytes(cursor, 8)?.try_into().unwrap());
        let script_pubkey = Script::deserialize(cursor)?;
        Ok(TxOut { amount, script_pubkey })
    }
}

/// A Bitcoin transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tx {
    version: u32,
    tx_ins: Vec<TxIn>,
    tx_outs: Vec<TxOut>,
    locktime: u32,
    testnet: bool,
}

impl Tx {
    /// Builds a transaction from its fields.
    pub fn new(version: u32, tx_ins: Vec<TxIn>, tx_outs: Vec<TxOut>, locktime: u32, testnet: bool) -> Self {
        Tx {
            version,
            tx_ins,
            tx_outs,
            locktime,
            testnet,
        }
    }

    /// Protocol version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Inputs, in order.
    pub fn tx_ins(&self) -> &[TxIn] {
        &self.tx_ins
    }

    /// Outputs, in order.
    pub fn tx_outs(&self) -> &[TxOut] {
        &self.tx_outs
    }

    /// `nLockTime`.
    pub fn locktime(&self) -> u32 {
        self.locktime
    }

    /// Whether this transaction was fetched/built for testnet.
    pub fn testnet(&self) -> bool {
        self.testnet
    }

    /// Serializes the legacy (non-SegWit) wire format.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend(encode_varint(self.tx_ins.len() as u64));
        for tx_in in &self.tx_ins {
            out.extend(tx_in.serialize());
        }
        out.extend(encode_varint(self.tx_outs.len() as u64));
        for tx_out in &self.tx_outs {
            out.extend(tx_out.serialize());
        }
        out.extend_from_slice(&self.locktime.to_le_bytes());
        out
    }

    /// Parses the legacy wire format.
    pub fn deserialize(cursor: &mut &[u8], testnet: bool) -> Result<Self> {
        let version = u32::from_le_bytes(take_bytes(cursor, 4)?.try_into().unwrap());
        let num_inputs = read_varint(cursor)?;
        let mut tx_ins = Vec::with_capacity(num_inputs as usize);
        for _ in 0..num_inputs {
            tx_ins.push(TxIn::deserialize(cursor)?);
        }
        let num_outputs = read_varint(cursor)?;
        let mut tx_outs = Vec::with_capacity(num_outputs as usize);
        for _ in 0..num_outputs {
            tx_outs.push(TxOut::deserialize(cursor)?);
        }
        let locktime = u32::from_le_bytes(take_bytes(cursor, 4)?.try_into().unwrap());
        Ok(Tx {
            version,
            tx_ins,
            tx_outs,
            locktime,
            testnet,
        })
    }

    /// `hash256` of the serialized transaction, in internal (little-endian)
    /// byte order.
    pub fn hash(&self) -> [u8; 32] {
        let mut h = hash256(&self.serialize());
        h.reverse();
        h
    }

    /// The transaction id: `hash()` rendered as hex.
    pub fn id(&self) -> String {
        hex::encode(self.hash())
    }

    /// The signature hash `z` for input `input_index`, with that input's
    /// scriptSig temporarily replaced by `script_pubkey` (the previous
    /// output's locking script), per the legacy sighash algorithm.
    pub fn sig_hash(&self, input_index: usize, script_pubkey: &Script) -> Result<num_bigint::BigUint> {
        if input_index >= self.tx_ins.len() {
            return Err(Error::Domain("input index out of range".into()));
        }
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend(encode_varint(self.tx_ins.len() as u64));
        for (i, tx_in) in self.tx_ins.iter().enumerate() {
            let substituted = if i == input_index {
                tx_in.with_script_sig(script_pubkey.clone())
            } else {
                tx_in.with_script_sig(Script::empty())
            };
            out.extend(substituted.serialize());
        }
        out.extend(encode_varint(self.tx_outs.len() as u64));
        for tx_out in &self.tx_outs {
            out.extend(tx_out.serialize());
        }
        out.extend_from_slice(&self.locktime.to_le_bytes());
        const SIGHASH_ALL: u32 = 1;
        out.extend_from_slice(&SIGHASH_ALL.to_le_bytes());
        Ok(num_bigint::BigUint::from_bytes_be(&hash256(&out)))
    }
}

impl std::fmt::Display for TxIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", hex::encode(self.prev_tx), self.prev_index)
    }
}

impl std::fmt::Display for TxOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.amount, self.script_pubkey)
    }
}

impl std::fmt::Display for Tx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "tx: {}", self.id())?;
        writeln!(f, "version: {}", self.version)?;
        writeln!(f, "tx_ins:")?;
        for tx_in in &self.tx_ins {
            writeln!(f, "{tx_in}")?;
        }
        writeln!(f, "tx_outs:")?;
        for tx_out in &self.tx_outs {
            writeln!(f, "{tx_out}")?;
        }
        write!(f, "locktime: {}", self.locktime)
    }
}

#[cfg(feature = "fetch")]
mod with_fetch {
    use super::*;
    use crate::fetch::TxFetcher;

    impl TxIn {
        /// Fetches the transaction this input spends from.
        pub fn fetch_prev_tx(&self, fetcher: &mut TxFetcher, testnet: bool) -> Result<Tx> {
            let tx_id = hex::encode(self.prev_tx);
            fetcher.fetch(&tx_id, testnet, false)
        }

        /// The amount (in satoshis) of the output this input spends.
        pub fn value(&self, fetcher: &mut TxFetcher, testnet: bool) -> Result<u64> {
            let tx = self.fetch_prev_tx(fetcher, testnet)?;
            let out = tx
                .tx_outs
                .get(self.prev_index as usize)
                .ok_or_else(|| Error::Domain("prev_index out of range".into()))?;
            Ok(out.amount)
        }

        /// The scriptPubKey of the output this input spends.
        pub fn script_pubkey(&self, fetcher: &mut TxFetcher, testnet: bool) -> Result<Script> {
            let tx = self.fetch_prev_tx(fetcher, testnet)?;
            let out = tx
                .tx_outs
                .get(self.prev_index as usize)
                .ok_or_else(|| Error::Domain("prev_index out of range".into()))?;
            Ok(out.script_pubkey.clone())
        }
    }

    impl Tx {
        /// The transaction fee: sum of input values minus sum of output
        /// amounts, fetching each referenced previous transaction through
        /// `fetcher`.
        pub fn fee(&self, fetcher: &mut TxFetcher) -> Result<i64> {
            let mut input_sum: i64 = 0;
            for tx_in in &self.tx_ins {
                input_sum += tx_in.value(fetcher, self.testnet)? as i64;
            }
            let output_sum: i64 = self.tx_outs.iter().map(|out| out.amount as i64).sum();
            Ok(input_sum - output_sum)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Command;

    fn sample_script() -> Script {
        Script::new(vec![Command::Op(118), Command::Op(169)])
    }

    #[test]
    fn tx_round_trips() {
        let tx_in = TxIn::new([0xab; 32], 0, Script::empty(), 0xffffffff);
        let tx_out = TxOut::new(5000, sample_script());
        let tx = Tx::new(1, vec![tx_in], vec![tx_out], 0, false);
        let bytes = tx.serialize();
        let mut cursor = bytes.as_slice();
        let parsed = Tx::deserialize(&mut cursor, false).unwrap();
        assert_eq!(parsed, tx);
        assert!(cursor.is_empty());
    }

    #[test]
    fn prev_tx_bytes_are_reversed_on_the_wire() {
        let mut prev_tx = [0u8; 32];
        prev_tx[0] = 0xde;
        prev_tx[31] = 0xad;
        let tx_in = TxIn::new(prev_tx, 0, Script::empty(), 0);
        let serialized = tx_in.serialize();
        assert_eq!(serialized[0], 0xad);
        assert_eq!(serialized[31], 0xde);
    }

    #[test]
    fn sig_hash_is_deterministic() {
        let tx_in = TxIn::new([0x11; 32], 0, Script::empty(), 0xffffffff);
        let tx_out = TxOut::new(1000, sample_script());
        let tx = Tx::new(1, vec![tx_in], vec![tx_out], 0, false);
        let pubkey_script = sample_script();
        let z1 = tx.sig_hash(0, &pubkey_script).unwrap();
        let z2 = tx.sig_hash(0, &pubkey_script).unwrap();
        assert_eq!(z1, z2);
    }

    #[test]
    fn sig_hash_rejects_out_of_range_input() {
        let tx = Tx::new(1, vec![], vec![], 0, false);
        assert!(tx.sig_hash(0, &Script::empty()).is_err());
    }
}
