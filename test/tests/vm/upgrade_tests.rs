use arbos_common::{
    Address, Bytes, H256, U256,
    constants::{ARB_OWNER_ADDRESS, SYSTEM_ADDRESS},
    types::{ArbosGenesis, InboxRequest, Receipt, TxRequest, TxResultCode},
    utils::keccak,
};
use arbos_storage::{
    AccountStore, ChainParameters, ExecutionContext, JumpDestTranslator, WorldState,
};
use arbos_vm::{
    Arbos, NoInterpreter, OwnerState, PrecompileEnv, UpgradeController, execute_precompile,
    calldata::{Value, encode_calldata},
    precompiles::arb_owner::ArbOwnerMethod,
};

const OWNER: Address = Address::repeat_byte(0x0a);

fn arbos() -> Arbos {
    Arbos::new(
        AccountStore::default(),
        ChainParameters::with_defaults(412_346, OWNER),
        Box::new(JumpDestTranslator),
    )
}

fn owner_call(method: ArbOwnerMethod, args: &[Value]) -> TxRequest {
    TxRequest {
        max_gas: 10_000,
        caller: OWNER,
        callee: ARB_OWNER_ADDRESS,
        gas_payer: OWNER,
        calldata: encode_calldata(method.signature(), args),
        inbox_request: InboxRequest {
            request_id: H256::repeat_byte(0x33),
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
    receipts.pop().expect("one receipt per request")
}

fn upload(arbos: &mut Arbos, chunks: &[&[u8]]) {
    let start = run(arbos, &owner_call(ArbOwnerMethod::StartCodeUpload, &[]));
    assert_eq!(start.result, TxResultCode::Success);
    for chunk in chunks {
        let receipt = run(
            arbos,
            &owner_call(
                ArbOwnerMethod::ContinueCodeUpload,
                &[Value::Bytes(Bytes::copy_from_slice(chunk))],
            ),
        );
        assert_eq!(receipt.result, TxResultCode::Success);
    }
}

fn finish(new_hash: H256, old_hash: H256) -> TxRequest {
    owner_call(
        ArbOwnerMethod::FinishCodeUploadAsArbosUpgrade,
        &[Value::FixedBytes(new_hash), Value::FixedBytes(old_hash)],
    )
}

#[test]
fn uploaded_code_becomes_the_running_code() {
    let mut arbos = arbos();
    upload(&mut arbos, &[&[0x60, 0x01, 0x5b], &[0x5b, 0x00]]);
    let hash = keccak([0x60u8, 0x01, 0x5b, 0x5b, 0x00]);

    let reported = run(&mut arbos, &owner_call(ArbOwnerMethod::GetUploadedCodeHash, &[]));
    assert_eq!(reported.return_data.as_ref(), hash.as_bytes());

    let receipt = run(&mut arbos, &finish(hash, H256::zero()));
    assert_eq!(receipt.result, TxResultCode::Success);
    assert_eq!(arbos.running_code().code_hash, hash);
    assert_eq!(arbos.upgrades().last_upgrade_hash(), hash);
    assert!(!arbos.upgrades().is_uploading());

    let last = run(&mut arbos, &owner_call(ArbOwnerMethod::GetLastUpgradeHash, &[]));
    assert_eq!(last.return_data.as_ref(), hash.as_bytes());
}

#[test]
fn chained_upgrades_must_name_the_previous_one() {
    let mut arbos = arbos();
    upload(&mut arbos, &[&[0x00]]);
    let first = keccak([0x00u8]);
    assert!(run(&mut arbos, &finish(first, H256::zero())).succeeded());

    let stale = run(
        &mut arbos,
        &owner_call(
            ArbOwnerMethod::StartCodeUploadWithCheck,
            &[Value::FixedBytes(H256::repeat_byte(0x99))],
        ),
    );
    assert_eq!(stale.result, TxResultCode::Revert);
    assert!(!arbos.upgrades().is_uploading());

    let checked = run(
        &mut arbos,
        &owner_call(ArbOwnerMethod::StartCodeUploadWithCheck, &[Value::FixedBytes(first)]),
    );
    assert!(checked.succeeded());
    assert!(arbos.upgrades().is_uploading());
}

#[test]
fn hash_mismatch_keeps_the_upload() {
    let mut arbos = arbos();
    upload(&mut arbos, &[&[0x5b, 0x00]]);
    let hash = keccak([0x5bu8, 0x00]);

    let wrong = run(&mut arbos, &finish(H256::repeat_byte(0x01), H256::zero()));
    assert_eq!(wrong.result, TxResultCode::Revert);
    assert_eq!(arbos.running_code().code_hash, H256::zero());
    assert_eq!(arbos.upgrades().uploaded_code_hash(), Ok(hash));

    assert!(run(&mut arbos, &finish(hash, H256::zero())).succeeded());
    assert_eq!(arbos.running_code().code_hash, hash);
}

#[test]
fn static_finish_does_not_upgrade() {
    let mut arbos = arbos();
    upload(&mut arbos, &[&[0x00]]);
    let hash = keccak([0x00u8]);
    let request = TxRequest {
        non_mutating: true,
        ..finish(hash, H256::zero())
    };

    assert!(run(&mut arbos, &request).succeeded());
    assert_eq!(arbos.running_code().code_hash, H256::zero());
    assert!(arbos.upgrades().is_uploading());
}

#[test]
fn finish_below_the_first_call_frame_is_fatal() {
    let world = WorldState::new(AccountStore::default());
    let frame = world
        .enter_call(&ExecutionContext::top_level())
        .expect("top level");
    let mut nested = frame.enter_nested();
    let mut params = ChainParameters::with_defaults(412_346, OWNER);
    let mut owner_state = OwnerState::default();
    let mut upgrades = UpgradeController::default();
    upgrades.start_code_upload();
    let mut executor = NoInterpreter;

    let mut env = PrecompileEnv {
        frame: &mut nested,
        caller: SYSTEM_ADDRESS,
        value: U256::zero(),
        params: &mut params,
        owner_state: &mut owner_state,
        upgrades: &mut upgrades,
        translator: &JumpDestTranslator,
        executor: &mut executor,
    };
    let err = execute_precompile(
        ARB_OWNER_ADDRESS,
        &mut env,
        &encode_calldata(
            ArbOwnerMethod::FinishCodeUploadAsArbosUpgrade.signature(),
            &[Value::FixedBytes(keccak(b"")), Value::FixedBytes(H256::zero())],
        ),
    )
    .expect_err("nested finish");

    assert!(err.is_fatal());
    assert!(upgrades.is_uploading());
    assert_eq!(upgrades.last_upgrade_hash(), H256::zero());
}

#[test]
fn genesis_seeds_accounts_and_parameters() {
    let json = r#"{
        "chainId": "412346",
        "owner": "0x0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a",
        "parameters": { "TxGasLimit": "0x3e8" },
        "alloc": {
            "0x0000000000000000000000000000000000001000": { "balance": "0x64", "nonce": 2 },
            "0x0000000000000000000000000000000000002000": { "code": "0x5b00" }
        }
    }"#;
    let genesis: ArbosGenesis = serde_json::from_str(json).expect("valid genesis");
    let mut arbos = Arbos::from_genesis(&genesis, Box::new(JumpDestTranslator)).expect("init");

    assert_eq!(arbos.params().owner(), OWNER);
    assert_eq!(arbos.params().chain_id(), 412_346);
    let accounts = arbos.accounts().expect("top level");
    assert_eq!(accounts.balance(Address::from_low_u64_be(0x1000)), U256::from(100));
    assert_eq!(accounts.nonce(Address::from_low_u64_be(0x1000)), 2);
    assert!(accounts.has_contract(Address::from_low_u64_be(0x2000)));
    assert_eq!(accounts.contract_count(), 1);

    let over_limit = TxRequest {
        max_gas: 1_001,
        ..owner_call(ArbOwnerMethod::GetLastUpgradeHash, &[])
    };
    assert_eq!(run(&mut arbos, &over_limit).result, TxResultCode::ExceededTxGasLimit);
}
