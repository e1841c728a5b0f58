use arbos_common::{
    Address, Bytes, H256, U256,
    constants::{
        ARB_GAS_INFO_ADDRESS, ARB_OWNER_ADDRESS, DEFAULT_GAS_POOL_MAX,
        DEFAULT_SPEED_LIMIT_PER_SECOND, DEFAULT_TX_GAS_LIMIT,
    },
    types::{InboxRequest, Receipt, TxRequest, TxResultCode},
    utils::{address_to_word, calculate_create_address, h256_to_u256, u256_to_h256},
};
use arbos_storage::{AccountStore, ChainParameter, ChainParameters, JumpDestTranslator};
use arbos_vm::{
    Arbos, NoInterpreter,
    calldata::{Value, encode_calldata, encode_tuple, encode_words},
    precompiles::{arb_gas_info::ArbGasInfoMethod, arb_owner::ArbOwnerMethod},
};
use hex_literal::hex;

// ==================== Helpers ====================

const OWNER: Address = Address::repeat_byte(0x0a);
const USER: Address = Address::repeat_byte(0x0b);
const INITIAL_BALANCE: u64 = 1_000_000;

fn arbos() -> Arbos {
    let mut accounts = AccountStore::default();
    for address in [OWNER, USER] {
        accounts
            .credit_balance(address, U256::from(INITIAL_BALANCE))
            .expect("credit");
    }
    Arbos::new(
        accounts,
        ChainParameters::with_defaults(412_346, OWNER),
        Box::new(JumpDestTranslator),
    )
}

fn call(caller: Address, callee: Address, calldata: Bytes) -> TxRequest {
    TxRequest {
        max_gas: 10_000,
        caller,
        callee,
        gas_payer: caller,
        calldata,
        inbox_request: InboxRequest {
            request_id: H256::repeat_byte(0x22),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn owner_call(method: ArbOwnerMethod, args: &[Value]) -> TxRequest {
    call(OWNER, ARB_OWNER_ADDRESS, encode_calldata(method.signature(), args))
}

fn run(arbos: &mut Arbos, request: &TxRequest) -> Receipt {
    let mut receipts = Vec::new();
    arbos
        .process_request(request, &mut NoInterpreter, &mut receipts)
        .expect("processing should not halt");
    receipts.pop().expect("one receipt per request")
}

fn run_ok(arbos: &mut Arbos, request: &TxRequest) -> Bytes {
    let receipt = run(arbos, request);
    assert_eq!(
        receipt.result,
        TxResultCode::Success,
        "{}",
        String::from_utf8_lossy(&receipt.return_data)
    );
    receipt.return_data
}

fn word(n: u64) -> Bytes {
    Bytes::copy_from_slice(u256_to_h256(U256::from(n)).as_bytes())
}

// ==================== ArbOwner ====================

#[test]
fn total_of_balances_counts_escrowed_gas() {
    let mut arbos = arbos();
    let request = TxRequest {
        gas_price: U256::from(7),
        ..owner_call(ArbOwnerMethod::GetTotalOfEthBalances, &[])
    };

    let output = run_ok(&mut arbos, &request);

    assert_eq!(output, word(2 * INITIAL_BALANCE));
    let accounts = arbos.accounts().expect("top level");
    assert_eq!(
        accounts.total_balance().expect("no overflow"),
        U256::from(2 * INITIAL_BALANCE)
    );
}

#[test]
fn parameters_set_by_owner_show_up_in_serialization() {
    let mut arbos = arbos();
    let id = h256_to_u256(ChainParameter::GasPriceOracle.id());
    run_ok(
        &mut arbos,
        &owner_call(
            ArbOwnerMethod::SetChainParameter,
            &[Value::Uint(id), Value::Uint(address_to_word(USER))],
        ),
    );
    assert_eq!(
        arbos.params().get_address(ChainParameter::GasPriceOracle),
        USER
    );

    let read = run_ok(
        &mut arbos,
        &owner_call(ArbOwnerMethod::GetChainParameter, &[Value::Uint(id)]),
    );
    assert_eq!(read.as_ref(), &address_to_word(USER).to_big_endian());

    let serialized = run_ok(&mut arbos, &owner_call(ArbOwnerMethod::SerializeAllParameters, &[]));
    assert_eq!(
        serialized.as_ref(),
        encode_tuple(&[Value::Bytes(arbos.params().serialize())]).as_slice()
    );
}

#[test]
fn deploy_contract_installs_code_for_the_deemed_sender() {
    let mut arbos = arbos();
    let deemed_sender = Address::from_low_u64_be(0xdead);
    let code = Bytes::copy_from_slice(&hex!("5b00"));

    let receipt = run(
        &mut arbos,
        &owner_call(
            ArbOwnerMethod::DeployContract,
            &[
                Value::Bytes(code.clone()),
                Value::Address(deemed_sender),
                Value::Uint(U256::from(7)),
            ],
        ),
    );

    let address = calculate_create_address(deemed_sender, 7);
    assert_eq!(receipt.result, TxResultCode::Success);
    assert_eq!(receipt.return_data.as_ref(), &address_to_word(address).to_big_endian());
    assert_eq!(receipt.gas_used, 2 * 200);

    let accounts = arbos.accounts().expect("top level");
    assert_eq!(accounts.nonce(deemed_sender), 8);
    assert_eq!(
        accounts.get(address).contract.map(|contract| contract.code),
        Some(code)
    );
}

#[test]
fn deploy_contract_refuses_an_occupied_address() {
    let mut arbos = arbos();
    let deemed_sender = Address::from_low_u64_be(0xdead);
    let deploy = owner_call(
        ArbOwnerMethod::DeployContract,
        &[
            Value::Bytes(Bytes::copy_from_slice(&hex!("00"))),
            Value::Address(deemed_sender),
            Value::Uint(U256::zero()),
        ],
    );
    run_ok(&mut arbos, &deploy);

    let again = run(&mut arbos, &deploy);
    assert_eq!(again.result, TxResultCode::Revert);
    assert_eq!(again.return_data.as_ref(), b"cannot deploy at address");
    assert_eq!(arbos.accounts().expect("top level").contract_count(), 1);
}

#[test]
fn allow_list_gates_admission() {
    let mut arbos = arbos();
    let transfer = TxRequest {
        value: U256::from(5),
        ..call(USER, OWNER, Bytes::new())
    };

    run_ok(&mut arbos, &owner_call(ArbOwnerMethod::AllowOnlyOwnerToSend, &[]));
    assert_eq!(run(&mut arbos, &transfer).result, TxResultCode::SenderNotPermitted);

    run_ok(
        &mut arbos,
        &owner_call(ArbOwnerMethod::AddAllowedSender, &[Value::Address(USER)]),
    );
    assert_eq!(run(&mut arbos, &transfer).result, TxResultCode::Success);

    let listed = run_ok(&mut arbos, &owner_call(ArbOwnerMethod::GetAllAllowedSenders, &[]));
    assert_eq!(
        listed.as_ref(),
        encode_tuple(&[Value::Bytes(encode_words([address_to_word(USER)]))]).as_slice()
    );

    run_ok(
        &mut arbos,
        &owner_call(ArbOwnerMethod::RemoveAllowedSender, &[Value::Address(USER)]),
    );
    assert_eq!(run(&mut arbos, &transfer).result, TxResultCode::SenderNotPermitted);

    run_ok(&mut arbos, &owner_call(ArbOwnerMethod::AllowAllSenders, &[]));
    assert_eq!(run(&mut arbos, &transfer).result, TxResultCode::Success);
    assert!(arbos.owner_state().allows_all_senders());
}

#[test]
fn fair_gas_price_senders_are_tracked() {
    let mut arbos = arbos();
    run_ok(
        &mut arbos,
        &owner_call(
            ArbOwnerMethod::SetFairGasPriceSender,
            &[Value::Address(USER), Value::Bool(true)],
        ),
    );
    let is_fair = run_ok(
        &mut arbos,
        &owner_call(ArbOwnerMethod::IsFairGasPriceSender, &[Value::Address(USER)]),
    );
    assert_eq!(is_fair, word(1));

    run_ok(
        &mut arbos,
        &owner_call(
            ArbOwnerMethod::SetFairGasPriceSender,
            &[Value::Address(USER), Value::Bool(false)],
        ),
    );
    assert!(!arbos.owner_state().is_fair_gas_price_sender(USER));
    assert_eq!(arbos.owner_state().fair_gas_price_senders().count(), 0);
}

#[test]
fn value_sent_to_a_non_payable_method_stays_with_the_caller() {
    let mut arbos = arbos();
    let request = TxRequest {
        value: U256::from(1_000),
        ..owner_call(ArbOwnerMethod::AllowAllSenders, &[])
    };
    let receipt = run(&mut arbos, &request);

    assert_eq!(receipt.result, TxResultCode::Revert);
    let accounts = arbos.accounts().expect("top level");
    assert_eq!(accounts.balance(OWNER), U256::from(INITIAL_BALANCE));
    assert_eq!(accounts.balance(ARB_OWNER_ADDRESS), U256::zero());
}

#[test]
fn reserve_funds_take_value_out_of_circulation() {
    let mut arbos = arbos();
    let request = TxRequest {
        value: U256::from(1_000),
        ..owner_call(ArbOwnerMethod::AddToReserveFunds, &[])
    };
    run_ok(&mut arbos, &request);

    assert_eq!(arbos.owner_state().reserve_funds(), U256::from(1_000));
    let accounts = arbos.accounts().expect("top level");
    assert_eq!(accounts.balance(OWNER), U256::from(INITIAL_BALANCE - 1_000));
    assert_eq!(accounts.balance(ARB_OWNER_ADDRESS), U256::zero());
}

// ==================== ArbGasInfo ====================

#[test]
fn prices_follow_the_l1_gas_price_estimate() {
    let mut arbos = arbos();
    let l1_price = 1_000_000u64;
    run_ok(
        &mut arbos,
        &call(
            OWNER,
            ARB_GAS_INFO_ADDRESS,
            encode_calldata(
                ArbGasInfoMethod::SetL1GasPriceEstimate.signature(),
                &[Value::Uint(U256::from(l1_price))],
            ),
        ),
    );
    assert_eq!(
        arbos.owner_state().l1_gas_price_estimate(),
        U256::from(l1_price)
    );

    let prices = run_ok(
        &mut arbos,
        &call(
            USER,
            ARB_GAS_INFO_ADDRESS,
            encode_calldata(ArbGasInfoMethod::GetPricesInWei.signature(), &[]),
        ),
    );
    let expected: Vec<Value> = [
        3700 * l1_price,
        16 * l1_price,
        2000 * l1_price,
        l1_price / 10_000,
        0,
        l1_price / 10_000,
    ]
    .into_iter()
    .map(|n| Value::Uint(U256::from(n)))
    .collect();
    assert_eq!(prices.as_ref(), encode_tuple(&expected).as_slice());
}

#[test]
fn strangers_cannot_set_the_l1_gas_price() {
    let mut arbos = arbos();
    let receipt = run(
        &mut arbos,
        &call(
            USER,
            ARB_GAS_INFO_ADDRESS,
            encode_calldata(
                ArbGasInfoMethod::SetL1GasPriceEstimate.signature(),
                &[Value::Uint(U256::from(5))],
            ),
        ),
    );
    assert_eq!(receipt.result, TxResultCode::Revert);
    assert_eq!(arbos.owner_state().l1_gas_price_estimate(), U256::zero());
}

#[test]
fn gas_accounting_params_report_the_limits() {
    let mut arbos = arbos();
    let output = run_ok(
        &mut arbos,
        &call(
            USER,
            ARB_GAS_INFO_ADDRESS,
            encode_calldata(ArbGasInfoMethod::GetGasAccountingParams.signature(), &[]),
        ),
    );
    let expected = [
        DEFAULT_SPEED_LIMIT_PER_SECOND,
        DEFAULT_GAS_POOL_MAX,
        DEFAULT_TX_GAS_LIMIT,
    ]
    .map(|n| Value::Uint(U256::from(n)));
    assert_eq!(output.as_ref(), encode_tuple(&expected).as_slice());
}
