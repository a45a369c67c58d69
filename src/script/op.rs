//! Opcode implementations for the Script stack machine.
//!
//! Grounded on `modified_src/op.py`'s `op_*` functions and the
//! `OP_CODE_FUNCTIONS`/`OP_CODE_NAMES` dispatch tables. Each function here
//! mirrors one Python `op_*` function: it mutates the stack in place and
//! returns `false` the moment the operation is invalid, exactly as the
//! original returns `False` rather than raising.

use crate::hash::{hash160, hash256};
use crate::keys::{PublicKey, Signature};
use crate::script::num::{decode_num, encode_num};

/// An element on the Script stack: an opaque byte string.
pub type Element = Vec<u8>;
/// The main data stack.
pub type Stack = Vec<Element>;

fn decode_top(stack: &[Element], idx_from_top: usize) -> Option<i64> {
    stack
        .get(stack.len().checked_sub(1 + idx_from_top)?)
        .map(|e| decode_num(e))
}

fn bool_element(value: bool) -> Element {
    encode_num(if value { 1 } else { 0 })
}

fn is_truthy(element: &[u8]) -> bool {
    decode_num(element) != 0
}

/// `OP_0` / `OP_FALSE`: push an empty element.
pub fn op_0(stack: &mut Stack) -> bool {
    stack.push(Vec::new());
    true
}

/// `OP_1NEGATE`.
pub fn op_1negate(stack: &mut Stack) -> bool {
    stack.push(encode_num(-1));
    true
}

/// `OP_1` through `OP_16`, parameterized by `n`.
pub fn op_n(stack: &mut Stack, n: i64) -> bool {
    stack.push(encode_num(n));
    true
}

/// `OP_NOP` and the reserved `OP_NOP1`/`OP_NOP4`..`OP_NOP10`: no-ops.
pub fn op_nop(_stack: &mut Stack) -> bool {
    true
}

/// `OP_VERIFY`: pop, fail if falsy.
pub fn op_verify(stack: &mut Stack) -> bool {
    match stack.pop() {
        Some(top) => is_truthy(&top),
        None => false,
    }
}

/// `OP_RETURN`: always fails evaluation.
pub fn op_return(_stack: &mut Stack) -> bool {
    false
}

/// `OP_TOALTSTACK`: move the top of the main stack to the alt stack.
pub fn op_toaltstack(stack: &mut Stack, alt_stack: &mut Stack) -> bool {
    match stack.pop() {
        Some(top) => {
            alt_stack.push(top);
            true
        }
        None => false,
    }
}

/// `OP_FROMALTSTACK`: move the top of the alt stack back to the main stack.
pub fn op_fromaltstack(stack: &mut Stack, alt_stack: &mut Stack) -> bool {
    match alt_stack.pop() {
        Some(top) => {
            stack.push(top);
            true
        }
        None => false,
    }
}

/// `OP_2DROP`.
pub fn op_2drop(stack: &mut Stack) -> bool {
    if stack.len() < 2 {
        return false;
    }
    stack.pop();
    stack.pop();
    true
}

/// `OP_2DUP`.
pub fn op_2dup(stack: &mut Stack) -> bool {
    if stack.len() < 2 {
        return false;
    }
    let n = stack.len();
    stack.extend_from_within(n - 2..n);
    true
}

/// `OP_3DUP`.
pub fn op_3dup(stack: &mut Stack) -> bool {
    if stack.len() < 3 {
        return false;
    }
    let n = stack.len();
    stack.extend_from_within(n - 3..n);
    true
}

/// `OP_2OVER`.
pub fn op_2over(stack: &mut Stack) -> bool {
    if stack.len() < 4 {
        return false;
    }
    let n = stack.len();
    stack.extend_from_within(n - 4..n - 2);
    true
}

/// `OP_2ROT`.
pub fn op_2rot(stack: &mut Stack) -> bool {
    if stack.len() < 6 {
        return false;
    }
    let n = stack.len();
    let pair: Vec<Element> = stack[n - 6..n - 4].to_vec();
    stack.drain(n - 6..n - 4);
    stack.extend(pair);
    true
}

/// `OP_2SWAP`.
pub fn op_2swap(stack: &mut Stack) -> bool {
    if stack.len() < 4 {
        return false;
    }
    let n = stack.len();
    stack.swap(n - 4, n - 2);
    stack.swap(n - 3, n - 1);
    true
}

/// `OP_IFDUP`: duplicate the top element if it is truthy.
pub fn op_ifdup(stack: &mut Stack) -> bool {
    match stack.last() {
        Some(top) => {
            if is_truthy(top) {
                stack.push(top.clone());
            }
            true
        }
        None => false,
    }
}

/// `OP_DEPTH`: push the current stack size.
pub fn op_depth(stack: &mut Stack) -> bool {
    stack.push(encode_num(stack.len() as i64));
    true
}

/// `OP_DROP`.
pub fn op_drop(stack: &mut Stack) -> bool {
    stack.pop().is_some()
}

/// `OP_DUP`.
pub fn op_dup(stack: &mut Stack) -> bool {
    match stack.last().cloned() {
        Some(top) => {
            stack.push(top);
            true
        }
        None => false,
    }
}

/// `OP_NIP`: remove the second-to-top element.
pub fn op_nip(stack: &mut Stack) -> bool {
    if stack.len() < 2 {
        return false;
    }
    let n = stack.len();
    stack.remove(n - 2);
    true
}

/// `OP_OVER`: copy the second-to-top element to the top.
pub fn op_over(stack: &mut Stack) -> bool {
    if stack.len() < 2 {
        return false;
    }
    let n = stack.len();
    stack.push(stack[n - 2].clone());
    true
}

/// `OP_PICK`: copy the `n`-th element from the top (after popping `n`).
pub fn op_pick(stack: &mut Stack) -> bool {
    let n = match stack.pop() {
        Some(top) => decode_num(&top),
        None => return false,
    };
    if n < 0 {
        return false;
    }
    let n = n as usize;
    if n >= stack.len() {
        return false;
    }
    let idx = stack.len() - 1 - n;
    stack.push(stack[idx].clone());
    true
}

/// `OP_ROLL`: move the `n`-th element from the top to the top.
pub fn op_roll(stack: &mut Stack) -> bool {
    let n = match stack.pop() {
        Some(top) => decode_num(&top),
        None => return false,
    };
    if n < 0 {
        return false;
    }
    let n = n as usize;
    if n >= stack.len() {
        return false;
    }
    let idx = stack.len() - 1 - n;
    let element = stack.remove(idx);
    stack.push(element);
    true
}

/// `OP_ROT`: rotate the top three elements.
pub fn op_rot(stack: &mut Stack) -> bool {
    if stack.len() < 3 {
        return false;
    }
    let n = stack.len();
    let bottom = stack.remove(n - 3);
    stack.push(bottom);
    true
}

/// `OP_SWAP`.
pub fn op_swap(stack: &mut Stack) -> bool {
    if stack.len() < 2 {
        return false;
    }
    let n = stack.len();
    stack.swap(n - 2, n - 1);
    true
}

/// `OP_TUCK`: copy the top element below the second-to-top.
pub fn op_tuck(stack: &mut Stack) -> bool {
    if stack.len() < 2 {
        return false;
    }
    let top = stack[stack.len() - 1].clone();
    let n = stack.len();
    stack.insert(n - 2, top);
    true
}

/// `OP_SIZE`: push the byte length of the top element, without popping it.
pub fn op_size(stack: &mut Stack) -> bool {
    match stack.last() {
        Some(top) => {
            stack.push(encode_num(top.len() as i64));
            true
        }
        None => false,
    }
}

/// `OP_EQUAL`: push whether the top two elements are byte-identical.
pub fn op_equal(stack: &mut Stack) -> bool {
    if stack.len() < 2 {
        return false;
    }
    let a = stack.pop().unwrap();
    let b = stack.pop().unwrap();
    stack.push(bool_element(a == b));
    true
}

/// `OP_EQUALVERIFY`: `OP_EQUAL` followed by `OP_VERIFY`.
pub fn op_equalverify(stack: &mut Stack) -> bool {
    op_equal(stack) && op_verify(stack)
}

fn unary_numeric<F: Fn(i64) -> i64>(stack: &mut Stack, f: F) -> bool {
    match stack.pop() {
        Some(top) => {
            stack.push(encode_num(f(decode_num(&top))));
            true
        }
        None => false,
    }
}

fn binary_numeric<F: Fn(i64, i64) -> i64>(stack: &mut Stack, f: F) -> bool {
    if stack.len() < 2 {
        return false;
    }
    let b = decode_num(&stack.pop().unwrap());
    let a = decode_num(&stack.pop().unwrap());
    stack.push(encode_num(f(a, b)));
    true
}

fn binary_predicate<F: Fn(i64, i64) -> bool>(stack: &mut Stack, f: F) -> bool {
    if stack.len() < 2 {
        return false;
    }
    let b = decode_num(&stack.pop().unwrap());
    let a = decode_num(&stack.pop().unwrap());
    stack.push(bool_element(f(a, b)));
    true
}

/// `OP_1ADD`.
pub fn op_1add(stack: &mut Stack) -> bool {
    unary_numeric(stack, |n| n + 1)
}

/// `OP_1SUB`.
pub fn op_1sub(stack: &mut Stack) -> bool {
    unary_numeric(stack, |n| n - 1)
}

/// `OP_NEGATE`.
pub fn op_negate(stack: &mut Stack) -> bool {
    unary_numeric(stack, |n| -n)
}

/// `OP_ABS`.
pub fn op_abs(stack: &mut Stack) -> bool {
    unary_numeric(stack, |n| n.abs())
}

/// `OP_NOT`: `1` if the input was zero, else `0`.
pub fn op_not(stack: &mut Stack) -> bool {
    unary_numeric(stack, |n| if n == 0 { 1 } else { 0 })
}

/// `OP_0NOTEQUAL`.
pub fn op_0notequal(stack: &mut Stack) -> bool {
    unary_numeric(stack, |n| if n != 0 { 1 } else { 0 })
}

/// `OP_ADD`.
pub fn op_add(stack: &mut Stack) -> bool {
    binary_numeric(stack, |a, b| a + b)
}

/// `OP_SUB`.
pub fn op_sub(stack: &mut Stack) -> bool {
    binary_numeric(stack, |a, b| a - b)
}

/// `OP_BOOLAND`.
pub fn op_booland(stack: &mut Stack) -> bool {
    binary_predicate(stack, |a, b| a != 0 && b != 0)
}

/// `OP_BOOLOR`.
pub fn op_boolor(stack: &mut Stack) -> bool {
    binary_predicate(stack, |a, b| a != 0 || b != 0)
}

/// `OP_NUMEQUAL`.
pub fn op_numequal(stack: &mut Stack) -> bool {
    binary_predicate(stack, |a, b| a == b)
}

/// `OP_NUMEQUALVERIFY`.
pub fn op_numequalverify(stack: &mut Stack) -> bool {
    op_numequal(stack) && op_verify(stack)
}

/// `OP_NUMNOTEQUAL`.
pub fn op_numnotequal(stack: &mut Stack) -> bool {
    binary_predicate(stack, |a, b| a != b)
}

/// `OP_LESSTHAN`.
pub fn op_lessthan(stack: &mut Stack) -> bool {
    binary_predicate(stack, |a, b| a < b)
}

/// `OP_GREATERTHAN`.
pub fn op_greaterthan(stack: &mut Stack) -> bool {
    binary_predicate(stack, |a, b| a > b)
}

/// `OP_LESSTHANOREQUAL`.
pub fn op_lessthanorequal(stack: &mut Stack) -> bool {
    binary_predicate(stack, |a, b| a <= b)
}

/// `OP_GREATERTHANOREQUAL`.
pub fn op_greaterthanorequal(stack: &mut Stack) -> bool {
    binary_predicate(stack, |a, b| a >= b)
}

/// `OP_MIN`.
pub fn op_min(stack: &mut Stack) -> bool {
    binary_numeric(stack, i64::min)
}

/// `OP_MAX`.
pub fn op_max(stack: &mut Stack) -> bool {
    binary_numeric(stack, i64::max)
}

/// `OP_WITHIN`: `minimum <= x < maximum`.
pub fn op_within(stack: &mut Stack) -> bool {
    if stack.len() < 3 {
        return false;
    }
    let maximum = decode_num(&stack.pop().unwrap());
    let minimum = decode_num(&stack.pop().unwrap());
    let x = decode_num(&stack.pop().unwrap());
    stack.push(bool_element(minimum <= x && x < maximum));
    true
}

/// `OP_RIPEMD160`.
pub fn op_ripemd160(stack: &mut Stack) -> bool {
    use ripemd::{Digest, Ripemd160};
    match stack.pop() {
        Some(top) => {
            stack.push(Ripemd160::digest(top).to_vec());
            true
        }
        None => false,
    }
}

/// `OP_SHA1`.
pub fn op_sha1(stack: &mut Stack) -> bool {
    use sha1::{Digest, Sha1};
    match stack.pop() {
        Some(top) => {
            stack.push(Sha1::digest(top).to_vec());
            true
        }
        None => false,
    }
}

/// `OP_SHA256`.
pub fn op_sha256(stack: &mut Stack) -> bool {
    use sha2::{Digest, Sha256};
    match stack.pop() {
        Some(top) => {
            stack.push(Sha256::digest(top).to_vec());
            true
        }
        None => false,
    }
}

/// `OP_HASH160`.
pub fn op_hash160(stack: &mut Stack) -> bool {
    match stack.pop() {
        Some(top) => {
            stack.push(hash160(&top));
            true
        }
        None => false,
    }
}

/// `OP_HASH256`.
pub fn op_hash256(stack: &mut Stack) -> bool {
    match stack.pop() {
        Some(top) => {
            stack.push(hash256(&top).to_vec());
            true
        }
        None => false,
    }
}

/// `OP_CHECKSIG`: pop pubkey and DER signature (with trailing sighash byte
/// stripped), verify against the provided signature hash `z`.
pub fn op_checksig(stack: &mut Stack, z: &num_bigint::BigUint) -> bool {
    if stack.len() < 2 {
        return false;
    }
    let sec_pubkey = stack.pop().unwrap();
    let mut der_signature = stack.pop().unwrap();
    if der_signature.is_empty() {
        stack.push(bool_element(false));
        return true;
    }
    der_signature.pop();
    let result = match (PublicKey::from_sec(&sec_pubkey), Signature::from_der(&der_signature)) {
        (Ok(point), Ok(sig)) => point.verify(z, &sig),
        _ => false,
    };
    stack.push(bool_element(result));
    true
}

/// `OP_CHECKSIGVERIFY`.
pub fn op_checksigverify(stack: &mut Stack, z: &num_bigint::BigUint) -> bool {
    op_checksig(stack, z) && op_verify(stack)
}

/// `OP_CHECKMULTISIG`: multisig verification is not implemented, matching
/// the original `op_checkmultisig`'s `raise NotImplementedError`. Unlike the
/// Python original this does not panic; it fails the script instead.
pub fn op_checkmultisig(_stack: &mut Stack, _z: &num_bigint::BigUint) -> bool {
    false
}

/// `OP_CHECKMULTISIGVERIFY`.
pub fn op_checkmultisigverify(stack: &mut Stack, z: &num_bigint::BigUint) -> bool {
    op_checkmultisig(stack, z) && op_verify(stack)
}

/// `OP_CHECKLOCKTIMEVERIFY` (BIP 65). Unlike the Python original (which
/// never threads `locktime`/`sequence` into this call despite `op.py`
/// defining the parameter), this takes both explicitly per the documented
/// arity category.
pub fn op_checklocktimeverify(stack: &Stack, locktime: u32, sequence: u32) -> bool {
    if sequence == 0xffffffff {
        return false;
    }
    let top = match decode_top(stack, 0) {
        Some(n) if n >= 0 => n,
        _ => return false,
    };
    const LOCKTIME_THRESHOLD: i64 = 500_000_000;
    let locktime = locktime as i64;
    if !((top < LOCKTIME_THRESHOLD) == (locktime < LOCKTIME_THRESHOLD)) {
        return false;
    }
    top <= locktime
}

/// `OP_CHECKSEQUENCEVERIFY` (BIP 112).
pub fn op_checksequenceverify(stack: &Stack, sequence: u32, version: u32) -> bool {
    let top = match decode_top(stack, 0) {
        Some(n) if n >= 0 => n,
        _ => return false,
    };
    if version < 2 {
        return false;
    }
    const SEQUENCE_DISABLE_FLAG: u32 = 1 << 31;
    if sequence & SEQUENCE_DISABLE_FLAG != 0 {
        return false;
    }
    if top as u32 & SEQUENCE_DISABLE_FLAG != 0 {
        return true;
    }
    const SEQUENCE_TYPE_FLAG: u32 = 1 << 22;
    const SEQUENCE_MASK: u32 = 0x0000ffff;
    let top_u32 = top as u32;
    if (sequence & SEQUENCE_TYPE_FLAG) != (top_u32 & SEQUENCE_TYPE_FLAG) {
        return false;
    }
    (top_u32 & SEQUENCE_MASK) <= (sequence & SEQUENCE_MASK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dup_and_equal_round_trip() {
        let mut stack: Stack = vec![vec![1, 2, 3]];
        assert!(op_dup(&mut stack));
        assert!(op_equal(&mut stack));
        assert_eq!(stack, vec![encode_num(1)]);
    }

    #[test]
    fn add_and_numequal() {
        let mut stack: Stack = vec![encode_num(4), encode_num(5)];
        assert!(op_add(&mut stack));
        assert_eq!(decode_num(stack.last().unwrap()), 9);
    }

    #[test]
    fn hash160_matches_helper() {
        let mut stack: Stack = vec![b"hello".to_vec()];
        assert!(op_hash160(&mut stack));
        assert_eq!(stack.pop().unwrap(), hash160(b"hello"));
    }

    #[test]
    fn checklocktimeverify_rejects_final_sequence() {
        let stack: Stack = vec![encode_num(500)];
        assert!(!op_checklocktimeverify(&stack, 600, 0xffffffff));
    }

    #[test]
    fn checklocktimeverify_accepts_satisfied_locktime() {
        let stack: Stack = vec![encode_num(500)];
        assert!(op_checklocktimeverify(&stack, 600, 0));
    }

    #[test]
    fn pick_and_roll_reach_depth() {
        let mut stack: Stack = vec![encode_num(1), encode_num(2), encode_num(3), encode_num(1)];
        assert!(op_pick(&mut stack));
        assert_eq!(decode_num(stack.last().unwrap()), 2);

        let mut stack: Stack = vec![encode_num(1), encode_num(2), encode_num(3), encode_num(2)];
        assert!(op_roll(&mut stack));
        assert_eq!(stack, vec![encode_num(2), encode_num(3), encode_num(1)]);
    }
}
