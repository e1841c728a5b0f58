use arbos_common::{
    Address, Bytes, H256, U256,
    constants::CREATE_ADDRESS,
    types::{InboxRequest, Receipt, RetryableRef, TxRequest, TxResultCode},
    utils::calculate_create_address,
};
use arbos_storage::{AccountStore, ChainParameters, JumpDestTranslator};
use arbos_vm::{Arbos, NoInterpreter};
use hex_literal::hex;

// ==================== Helpers ====================

const OWNER: Address = Address::repeat_byte(0x0a);
const SENDER: u64 = 0x1000;
const RECIPIENT: u64 = 0x2000;
const SENDER_BALANCE: u64 = 10_000_000;

fn sender() -> Address {
    Address::from_low_u64_be(SENDER)
}

fn arbos_with_sender_nonce(nonce: u64) -> Arbos {
    let mut accounts = AccountStore::default();
    accounts
        .credit_balance(sender(), U256::from(SENDER_BALANCE))
        .expect("credit");
    accounts.set_nonce(sender(), nonce);
    Arbos::new(
        accounts,
        ChainParameters::with_defaults(412_346, OWNER),
        Box::new(JumpDestTranslator),
    )
}

fn tx(callee: Address, sequence_number: Option<u64>) -> TxRequest {
    TxRequest {
        max_gas: 100_000,
        gas_price: U256::from(10),
        sequence_number,
        caller: sender(),
        callee,
        gas_payer: sender(),
        inbox_request: InboxRequest {
            request_id: H256::repeat_byte(0x11),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn run(arbos: &mut Arbos, request: &TxRequest) -> Receipt {
    let mut receipts = Vec::new();
    arbos
        .process_request(request, &mut NoInterpreter, &mut receipts)
        .expect("processing should not halt");
    assert_eq!(receipts.len(), 1);
    receipts.remove(0)
}

fn nonce(arbos: &Arbos) -> u64 {
    arbos.accounts().expect("top level").nonce(sender())
}

// ==================== Sequence numbers ====================

#[test]
fn sequenced_call_is_accepted_once() {
    let mut arbos = arbos_with_sender_nonce(5);
    let request = tx(Address::from_low_u64_be(RECIPIENT), Some(5));

    let receipt = run(&mut arbos, &request);
    assert_eq!(receipt.result, TxResultCode::Success);
    assert_eq!(nonce(&arbos), 6);

    let replay = run(&mut arbos, &request);
    assert_eq!(replay.result, TxResultCode::SequenceNumberTooLow);
    assert_eq!(replay.gas_used, 0);
    assert_eq!(nonce(&arbos), 6);
}

#[test]
fn nonces_never_decrease_across_mixed_requests() {
    let mut arbos = arbos_with_sender_nonce(0);
    let requests = [
        tx(Address::from_low_u64_be(RECIPIENT), Some(0)),
        tx(Address::from_low_u64_be(RECIPIENT), Some(0)),
        tx(Address::from_low_u64_be(RECIPIENT), None),
        tx(Address::from_low_u64_be(RECIPIENT), Some(3)),
        tx(Address::from_low_u64_be(RECIPIENT), Some(1)),
        tx(CREATE_ADDRESS, None),
    ];
    let mut previous = nonce(&arbos);
    let mut accepted_sequenced = 0;
    for request in &requests {
        let receipt = run(&mut arbos, request);
        let current = nonce(&arbos);
        assert!(current >= previous);
        if receipt.result == TxResultCode::Success
            && (request.sequence_number.is_some() || request.is_create())
        {
            accepted_sequenced += 1;
            assert_eq!(current, previous + 1);
        } else {
            assert_eq!(current, previous);
        }
        previous = current;
    }
    assert_eq!(accepted_sequenced, 3);
}

// ==================== Contract creation ====================

#[test]
fn creation_uses_current_nonce_for_the_address() {
    let mut arbos = arbos_with_sender_nonce(3);
    let request = TxRequest {
        calldata: Bytes::copy_from_slice(&hex!("60016000555b00")),
        ..tx(CREATE_ADDRESS, None)
    };

    let receipt = run(&mut arbos, &request);
    let expected = calculate_create_address(sender(), 3);

    assert_eq!(receipt.result, TxResultCode::Success);
    assert_eq!(&receipt.return_data[12..], expected.as_bytes());
    assert_eq!(nonce(&arbos), 4);
    assert!(arbos.accounts().expect("top level").has_contract(expected));
}

#[test]
fn forced_replay_of_a_creation_hits_the_existing_contract() {
    let mut arbos = arbos_with_sender_nonce(3);
    let request = TxRequest {
        calldata: Bytes::copy_from_slice(&hex!("00")),
        ..tx(CREATE_ADDRESS, None)
    };
    assert_eq!(run(&mut arbos, &request).result, TxResultCode::Success);

    arbos.accounts_mut().expect("top level").set_nonce(sender(), 3);
    let replay = run(&mut arbos, &request);

    assert_eq!(replay.result, TxResultCode::CannotDeployAtAddress);
    assert_eq!(nonce(&arbos), 3);
    let accounts = arbos.accounts().expect("top level");
    assert_eq!(accounts.contract_count(), 1);
    assert_eq!(
        accounts
            .get(calculate_create_address(sender(), 3))
            .contract
            .map(|contract| contract.code),
        Some(Bytes::copy_from_slice(&hex!("00")))
    );
}

#[test]
fn static_creation_is_rejected_as_revert() {
    let mut arbos = arbos_with_sender_nonce(0);
    let request = TxRequest {
        non_mutating: true,
        ..tx(CREATE_ADDRESS, None)
    };
    let receipt = run(&mut arbos, &request);
    assert_eq!(receipt.result, TxResultCode::Revert);
    assert_eq!(nonce(&arbos), 0);
}

// ==================== Gas ====================

#[test]
fn gas_payer_must_cover_max_gas() {
    let mut arbos = arbos_with_sender_nonce(0);
    let request = TxRequest {
        gas_price: U256::from(SENDER_BALANCE),
        ..tx(Address::from_low_u64_be(RECIPIENT), None)
    };
    let receipt = run(&mut arbos, &request);
    assert_eq!(receipt.result, TxResultCode::NoGasFunds);
    assert_eq!(
        arbos.accounts().expect("top level").balance(sender()),
        U256::from(SENDER_BALANCE)
    );
}

#[test]
fn storage_gas_is_paid_to_the_fee_recipient() {
    let mut arbos = arbos_with_sender_nonce(0);
    let code = Bytes::copy_from_slice(&hex!("5b5b5b5b"));
    let request = TxRequest {
        calldata: code.clone(),
        ..tx(CREATE_ADDRESS, None)
    };
    let receipt = run(&mut arbos, &request);

    let fee = U256::from(receipt.gas_used) * request.gas_price;
    assert_eq!(receipt.gas_used, 4 * 200);
    let accounts = arbos.accounts().expect("top level");
    assert_eq!(accounts.balance(OWNER), fee);
    assert_eq!(accounts.balance(sender()), U256::from(SENDER_BALANCE) - fee);
    assert_eq!(accounts.escrow().total(), Ok(U256::zero()));
}

// ==================== Retryable redeems ====================

fn held(arbos: &Arbos) -> U256 {
    let accounts = arbos.accounts().expect("top level");
    accounts.total_balance().expect("no overflow") + accounts.escrow().total().expect("no overflow")
}

fn open_ticket(arbos: &mut Arbos, amount: u64) -> u64 {
    arbos
        .accounts_mut()
        .expect("top level")
        .open_escrow(sender(), U256::from(amount))
        .expect("funded")
}

fn redeem(caller: Address, gas_payer: Address, escrow_key: u64, gas_price: u64) -> TxRequest {
    TxRequest {
        max_gas: 50,
        gas_price: U256::from(gas_price),
        caller,
        gas_payer,
        retryable: Some(RetryableRef {
            escrow_key,
            ..Default::default()
        }),
        ..tx(Address::from_low_u64_be(RECIPIENT), None)
    }
}

#[test]
fn strangers_cannot_redeem_someone_elses_ticket() {
    let mut arbos = arbos_with_sender_nonce(0);
    let key = open_ticket(&mut arbos, 1_000);
    let thief = Address::from_low_u64_be(0x6666);
    let total = held(&arbos);

    for request in [
        redeem(thief, thief, key, 0),
        redeem(thief, thief, key + 1, 0),
        redeem(thief, thief, 0, 0),
    ] {
        assert_eq!(run(&mut arbos, &request).result, TxResultCode::NoGasFunds);
    }

    let accounts = arbos.accounts().expect("top level");
    assert_eq!(accounts.balance(thief), U256::zero());
    assert_eq!(accounts.escrow().balance(key), U256::from(1_000));
    assert_eq!(held(&arbos), total);
}

#[test]
fn redeem_must_be_covered_by_the_ticket() {
    let mut arbos = arbos_with_sender_nonce(0);
    let key = open_ticket(&mut arbos, 100);

    let receipt = run(&mut arbos, &redeem(sender(), sender(), key, 3));

    assert_eq!(receipt.result, TxResultCode::NoGasFunds);
    assert_eq!(
        arbos.accounts().expect("top level").escrow().balance(key),
        U256::from(100)
    );
}

#[test]
fn redeem_refunds_the_ticket_payer() {
    let mut arbos = arbos_with_sender_nonce(0);
    let key = open_ticket(&mut arbos, 1_000);
    let total = held(&arbos);
    let redeemer = Address::from_low_u64_be(0x7777);
    assert!(arbos.owner_state().is_allowed_sender(redeemer, OWNER));

    let receipt = run(&mut arbos, &redeem(redeemer, sender(), key, 10));

    assert_eq!(receipt.result, TxResultCode::Success);
    let accounts = arbos.accounts().expect("top level");
    assert_eq!(accounts.escrow().balance(key), U256::zero());
    assert_eq!(accounts.balance(sender()), U256::from(SENDER_BALANCE));
    assert_eq!(accounts.balance(redeemer), U256::zero());
    assert_eq!(held(&arbos), total);
}
