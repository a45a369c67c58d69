//! End-to-end scenarios spanning keys, Script, and transactions: building
//! and evaluating a real P2PKH scriptSig + scriptPubKey pair, and the BIP
//! 65 timelock opcode wired through a transaction's locktime/sequence.

use num_bigint::BigUint;

use btccore::keys::PrivateKey;
use btccore::script::{Command, Script};
use btccore::tx::{Tx, TxIn, TxOut};

fn p2pkh_script_pubkey(pubkey_hash: &[u8]) -> Script {
    Script::new(vec![
        Command::Op(118), // OP_DUP
        Command::Op(169), // OP_HASH160
        Command::Element(pubkey_hash.to_vec()),
        Command::Op(136), // OP_EQUALVERIFY
        Command::Op(172), // OP_CHECKSIG
    ])
}

fn p2pkh_script_sig(der_sig: Vec<u8>, sec_pubkey: Vec<u8>) -> Script {
    let mut sig_with_hashtype = der_sig;
    sig_with_hashtype.push(0x01); // SIGHASH_ALL
    Script::new(vec![
        Command::Element(sig_with_hashtype),
        Command::Element(sec_pubkey),
    ])
}

#[test]
fn p2pkh_spend_round_trips_through_sig_hash_and_evaluate() {
    let sender = PrivateKey::new(BigUint::from(424_242u32)).unwrap();
    let sec_pubkey = sender.public_key().sec(true);
    let pubkey_hash = btccore::hash::hash160(&sec_pubkey);

    let prev_script_pubkey = p2pkh_script_pubkey(&pubkey_hash);
    let tx_in = TxIn::new([0x11; 32], 0, Script::empty(), 0xffffffff);
    let tx_out = TxOut::new(4_500, p2pkh_script_pubkey(&pubkey_hash));
    let tx = Tx::new(1, vec![tx_in], vec![tx_out], 0, false);

    let z = tx.sig_hash(0, &prev_script_pubkey).unwrap();
    let signature = sender.sign(&z);

    let combined = p2pkh_script_sig(signature.der(), sec_pubkey).add(&prev_script_pubkey);
    assert!(combined.evaluate(&z, tx.locktime(), 0xffffffff, tx.version()));
}

#[test]
fn p2pkh_spend_fails_with_wrong_key() {
    let sender = PrivateKey::new(BigUint::from(1u32)).unwrap();
    let attacker = PrivateKey::new(BigUint::from(2u32)).unwrap();
    let pubkey_hash = btccore::hash::hash160(&sender.public_key().sec(true));

    let prev_script_pubkey = p2pkh_script_pubkey(&pubkey_hash);
    let tx_in = TxIn::new([0x22; 32], 1, Script::empty(), 0xffffffff);
    let tx_out = TxOut::new(1_000, p2pkh_script_pubkey(&pubkey_hash));
    let tx = Tx::new(1, vec![tx_in], vec![tx_out], 0, false);

    let z = tx.sig_hash(0, &prev_script_pubkey).unwrap();
    let wrong_signature = attacker.sign(&z);
    let attacker_pubkey = attacker.public_key().sec(true);

    let combined = p2pkh_script_sig(wrong_signature.der(), attacker_pubkey).add(&prev_script_pubkey);
    assert!(!combined.evaluate(&z, tx.locktime(), 0xffffffff, tx.version()));
}

#[test]
fn checklocktimeverify_gates_spend_on_transaction_locktime() {
    // A scriptPubKey that requires the spending tx's locktime to have
    // reached 600 before the rest of the script (a simple OP_1) runs.
    let timelocked_script = Script::new(vec![
        Command::Element(btccore::script::num::encode_num(600)),
        Command::Op(177), // OP_CHECKLOCKTIMEVERIFY
        Command::Op(117), // OP_DROP
        Command::Op(81),  // OP_1
    ]);

    let zero = BigUint::from(0u32);

    let maturing_tx_in = TxIn::new([0x33; 32], 0, Script::empty(), 0xfffffffe);
    let maturing_tx = Tx::new(2, vec![maturing_tx_in], vec![], 700, false);
    assert!(timelocked_script.evaluate(
        &zero,
        maturing_tx.locktime(),
        maturing_tx.tx_ins()[0].sequence(),
        maturing_tx.version()
    ));

    let premature_tx_in = TxIn::new([0x33; 32], 0, Script::empty(), 0xfffffffe);
    let premature_tx = Tx::new(2, vec![premature_tx_in], vec![], 500, false);
    assert!(!timelocked_script.evaluate(
        &zero,
        premature_tx.locktime(),
        premature_tx.tx_ins()[0].sequence(),
        premature_tx.version()
    ));
}

#[test]
fn tx_serialization_round_trips_across_multiple_inputs_and_outputs() {
    let script_pubkey = p2pkh_script_pubkey(&[0xaa; 20]);
    let tx_ins = vec![
        TxIn::new([0x01; 32], 0, Script::empty(), 0xffffffff),
        TxIn::new([0x02; 32], 3, Script::empty(), 0xfffffffe),
    ];
    let tx_outs = vec![
        TxOut::new(1_000, script_pubkey.clone()),
        TxOut::new(2_000, script_pubkey),
    ];
    let tx = Tx::new(1, tx_ins, tx_outs, 123456, true);

    let bytes = tx.serialize();
    let mut cursor = bytes.as_slice();
    let parsed = Tx::deserialize(&mut cursor, true).unwrap();
    assert_eq!(parsed, tx);
    assert_eq!(parsed.id(), tx.id());
}
