//! Integration tests for the yield aggregator client
//!
//! Drives the full client (amount parsing, address derivation, account
//! codecs, instruction encoding, submission and confirmation) against the
//! in-process ledger.
//!
//! Run with: cargo test --test client_integration

use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

use xchain_yield::{
    BridgeRequestId, BridgeStatus, ChainRegistry, ClientContext, ClientError, GlobalState,
    ManualClock, MemoryTransport, OracleData, ProgramAccount, RequestKeying, UserState,
    YieldClient, YieldRates,
};

const T0: i64 = 1_700_000_000;
const EVM_TARGET: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

struct Harness {
    client: YieldClient,
    transport: Arc<MemoryTransport>,
    clock: Arc<ManualClock>,
    authority: Pubkey,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("xchain_yield=debug")
        .with_test_writer()
        .try_init();
}

impl Harness {
    /// Per-user bridge requests, as the deployed program keys them.
    async fn new() -> Self {
        Self::with_keying(RequestKeying::PerUser).await
    }

    /// Any number of bridge requests per user.
    async fn sequenced() -> Self {
        Self::with_keying(RequestKeying::Sequenced).await
    }

    async fn with_keying(keying: RequestKeying) -> Self {
        init_tracing();
        let program_id = Pubkey::new_unique();
        let clock = Arc::new(ManualClock::new(T0));
        let transport = Arc::new(
            MemoryTransport::new(program_id, ChainRegistry::default(), clock.clone())
                .with_keying(keying),
        );
        let ctx = ClientContext {
            program_id,
            amounts: xchain_yield::AmountCodec::new(6).unwrap(),
            mint: None,
            chains: ChainRegistry::default(),
            keying,
            transport: transport.clone(),
            clock: clock.clone(),
        };
        let client = YieldClient::new(ctx);
        let authority = Pubkey::new_unique();
        client.initialize(&authority).await.unwrap();
        Self {
            client,
            transport,
            clock,
            authority,
        }
    }

    async fn global(&self) -> GlobalState {
        self.client.global_state().await.unwrap()
    }

    async fn user(&self, user: &Pubkey) -> UserState {
        self.client.user_state(user).await.unwrap().unwrap()
    }

    async fn funded_user(&self, amount: &str) -> Pubkey {
        let user = Pubkey::new_unique();
        self.client
            .deposit(&user, &Pubkey::new_unique(), amount)
            .await
            .unwrap();
        user
    }
}

/// Small deterministic generator for operation sequences
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

// ============================================================================
// Scenarios
// ============================================================================

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn test_scenario_a_deposit() {
        let h = Harness::new().await;
        let user = Pubkey::new_unique();
        let receipt = tokio_test::assert_ok!(
            h.client
                .deposit(&user, &Pubkey::new_unique(), "100.0")
                .await
        );

        assert_eq!(receipt.amount, 100_000_000);
        assert_eq!(receipt.global.total_deposits, 100_000_000);
        assert_eq!(h.global().await.total_deposits, 100_000_000);

        let state = h.user(&user).await;
        assert_eq!(state.deposited_amount, 100_000_000);
        assert_eq!(state.last_deposit_timestamp, T0);
        assert_eq!(receipt.user, Some(state));
    }

    #[tokio::test]
    async fn test_scenario_b_withdraw() {
        let h = Harness::new().await;
        let user = h.funded_user("100").await;

        h.client
            .withdraw(&user, &Pubkey::new_unique(), "25")
            .await
            .unwrap();

        assert_eq!(h.user(&user).await.deposited_amount, 75_000_000);
        assert_eq!(h.global().await.total_deposits, 75_000_000);
    }

    #[tokio::test]
    async fn test_scenario_c_initiate() {
        let h = Harness::new().await;
        let user = h.funded_user("100").await;

        let receipt = h
            .client
            .initiate_cross_chain_transfer(&user, 2, "25", EVM_TARGET)
            .await
            .unwrap();
        let (id, projected) = receipt.bridge.unwrap();
        assert_eq!(id, BridgeRequestId::new(user, 0));

        let request = h.client.bridge_request(&id).await.unwrap().unwrap();
        assert_eq!(request, projected);
        assert_eq!(request.status, BridgeStatus::Pending);
        assert_eq!(request.amount, 25_000_000);
        assert_eq!(request.target_chain, 2);
        assert_eq!(request.created_at, T0);
        assert_eq!(request.target_address[..12], [0u8; 12]);

        let state = h.user(&user).await;
        assert_eq!(state.pending_cross_chain_transfers, 25_000_000);
        assert_eq!(state.deposited_amount, 100_000_000);
        assert_eq!(h.global().await.pending_cross_chain_amount, 25_000_000);
    }

    #[tokio::test]
    async fn test_scenario_d_complete() {
        let h = Harness::new().await;
        let user = h.funded_user("100").await;
        h.client
            .initiate_cross_chain_transfer(&user, 2, "25", EVM_TARGET)
            .await
            .unwrap();

        h.clock.advance(600);
        let id = BridgeRequestId::new(user, 0);
        h.client
            .complete_cross_chain_transfer(&h.authority, &id, true)
            .await
            .unwrap();

        let request = h.client.bridge_request(&id).await.unwrap().unwrap();
        assert_eq!(request.status, BridgeStatus::Completed);
        assert_eq!(request.completed_at, T0 + 600);

        let state = h.user(&user).await;
        assert_eq!(state.cross_chain_deposits, 25_000_000);
        assert_eq!(state.pending_cross_chain_transfers, 0);

        let global = h.global().await;
        assert_eq!(global.total_cross_chain_deposits, 25_000_000);
        assert_eq!(global.pending_cross_chain_amount, 0);
    }

    #[tokio::test]
    async fn test_scenario_e_non_authority_complete() {
        let h = Harness::new().await;
        let user = h.funded_user("100").await;
        h.client
            .initiate_cross_chain_transfer(&user, 2, "25", EVM_TARGET)
            .await
            .unwrap();

        let id = BridgeRequestId::new(user, 0);
        let global = h.global().await;
        let state = h.user(&user).await;
        let submitted = h.transport.submitted_count().await;

        let err = h
            .client
            .complete_cross_chain_transfer(&user, &id, true)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClientError::Unauthorized {
                signer: user,
                expected: h.authority,
            }
        );

        assert_eq!(h.global().await, global);
        assert_eq!(h.user(&user).await, state);
        let request = h.client.bridge_request(&id).await.unwrap().unwrap();
        assert_eq!(request.status, BridgeStatus::Pending);
        assert_eq!(h.transport.submitted_count().await, submitted);
    }
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use super::*;

    async fn assert_conservation(h: &Harness) {
        let global = h.global().await;
        let users = h.transport.accounts_of::<UserState>().await.unwrap();
        let requests = h
            .transport
            .accounts_of::<xchain_yield::BridgeRequest>()
            .await
            .unwrap();

        let deposited: u64 = users.iter().map(|(_, u)| u.deposited_amount).sum();
        assert_eq!(global.total_deposits, deposited);

        let pending: u64 = requests
            .iter()
            .filter(|(_, r)| !r.status.is_terminal())
            .map(|(_, r)| r.amount)
            .sum();
        assert_eq!(global.pending_cross_chain_amount, pending);

        let completed: u64 = requests
            .iter()
            .filter(|(_, r)| r.status == BridgeStatus::Completed)
            .map(|(_, r)| r.amount)
            .sum();
        assert_eq!(global.total_cross_chain_deposits, completed);

        for (_, user) in &users {
            let own_pending: u64 = requests
                .iter()
                .filter(|(_, r)| r.user == user.user && !r.status.is_terminal())
                .map(|(_, r)| r.amount)
                .sum();
            assert_eq!(user.pending_cross_chain_transfers, own_pending);
        }
    }

    #[tokio::test]
    async fn test_totals_are_conserved_over_operation_sequences() {
        let h = Harness::sequenced().await;
        let users: Vec<Pubkey> = (0..4).map(|_| Pubkey::new_unique()).collect();
        let token_account = Pubkey::new_unique();
        let mut rng = Lcg(7);
        let mut open: Vec<BridgeRequestId> = Vec::new();

        for _ in 0..120 {
            let user = users[rng.below(users.len() as u64) as usize];
            let amount = format!("{}.{:02}", rng.below(50), rng.below(100));
            h.clock.advance(rng.below(3_600) as i64);

            let result = match rng.below(4) {
                0 => h.client.deposit(&user, &token_account, &amount).await,
                1 => h.client.withdraw(&user, &token_account, &amount).await,
                2 => {
                    let target = 2 + rng.below(2) as u8;
                    let result = h
                        .client
                        .initiate_cross_chain_transfer(&user, target, &amount, EVM_TARGET)
                        .await;
                    if let Ok(receipt) = &result {
                        open.push(receipt.bridge.as_ref().unwrap().0);
                    }
                    result
                }
                _ if !open.is_empty() => {
                    let id = open.swap_remove(rng.below(open.len() as u64) as usize);
                    h.client
                        .complete_cross_chain_transfer(&h.authority, &id, rng.below(2) == 0)
                        .await
                }
                _ => h.client.deposit(&user, &token_account, &amount).await,
            };

            // Only precondition failures are expected from the ledger
            if let Err(e) = result {
                assert!(
                    matches!(
                        e,
                        ClientError::InsufficientBalance { .. } | ClientError::InvalidAmount { .. }
                    ),
                    "unexpected error {:?}",
                    e
                );
            }
            assert_conservation(&h).await;
        }
    }

    #[tokio::test]
    async fn test_failed_withdraw_leaves_state_unchanged() {
        let h = Harness::new().await;
        let user = h.funded_user("10").await;
        let mut rng = Lcg(42);

        for _ in 0..20 {
            let over = 10_000_001 + rng.below(1_000_000_000);
            let text = h.client.format_amount(over);
            let global = h.global().await;
            let state = h.user(&user).await;

            let err = h
                .client
                .withdraw(&user, &Pubkey::new_unique(), &text)
                .await
                .unwrap_err();
            assert_eq!(
                err,
                ClientError::InsufficientBalance {
                    requested: over,
                    available: 10_000_000,
                }
            );
            assert_eq!(h.global().await, global);
            assert_eq!(h.user(&user).await, state);
        }
    }

    #[tokio::test]
    async fn test_terminal_requests_never_move() {
        let h = Harness::sequenced().await;
        let user = h.funded_user("100").await;
        for success in [true, false] {
            let receipt = h
                .client
                .initiate_cross_chain_transfer(&user, 3, "10", EVM_TARGET)
                .await
                .unwrap();
            let id = receipt.bridge.unwrap().0;
            h.client
                .complete_cross_chain_transfer(&h.authority, &id, success)
                .await
                .unwrap();
            let terminal = h.client.bridge_request(&id).await.unwrap().unwrap();

            for again in [true, false] {
                let err = h
                    .client
                    .complete_cross_chain_transfer(&h.authority, &id, again)
                    .await
                    .unwrap_err();
                assert!(matches!(err, ClientError::InvalidTransition { .. }));
            }
            assert!(matches!(
                h.client.record_processing(&id).await,
                Err(ClientError::InvalidTransition { .. })
            ));
            assert_eq!(h.client.bridge_request(&id).await.unwrap().unwrap(), terminal);
        }
    }
}

// ============================================================================
// Failure Handling
// ============================================================================

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_initialize_twice() {
        let h = Harness::new().await;
        let err = h.client.initialize(&Pubkey::new_unique()).await.unwrap_err();
        assert_eq!(
            err,
            ClientError::AlreadyInitialized {
                authority: h.authority
            }
        );
    }

    #[tokio::test]
    async fn test_operations_before_initialize() {
        let program_id = Pubkey::new_unique();
        let clock = Arc::new(ManualClock::new(T0));
        let transport = Arc::new(MemoryTransport::new(
            program_id,
            ChainRegistry::default(),
            clock.clone(),
        ));
        let client = YieldClient::new(ClientContext {
            program_id,
            amounts: xchain_yield::AmountCodec::new(9).unwrap(),
            mint: None,
            chains: ChainRegistry::default(),
            keying: RequestKeying::default(),
            transport,
            clock,
        });

        let err = client
            .deposit(&Pubkey::new_unique(), &Pubkey::new_unique(), "1")
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::NotInitialized);
    }

    #[tokio::test]
    async fn test_invalid_input_is_never_submitted() {
        let h = Harness::new().await;
        let user = h.funded_user("100").await;
        let submitted = h.transport.submitted_count().await;
        let token_account = Pubkey::new_unique();

        for amount in ["0", "0.0000001", "-1", "abc", "", "1e5"] {
            assert!(matches!(
                h.client.deposit(&user, &token_account, amount).await,
                Err(ClientError::InvalidAmount { .. })
            ));
        }
        assert_eq!(
            h.client
                .initiate_cross_chain_transfer(&user, 99, "1", EVM_TARGET)
                .await
                .unwrap_err(),
            ClientError::UnsupportedChain { chain_id: 99 }
        );
        assert!(matches!(
            h.client
                .initiate_cross_chain_transfer(&user, 2, "1", "0xdead")
                .await,
            Err(ClientError::InvalidAddress { .. })
        ));
        assert!(matches!(
            h.client
                .initiate_cross_chain_transfer(&user, 2, "101", EVM_TARGET)
                .await,
            Err(ClientError::InsufficientBalance { .. })
        ));
        assert_eq!(h.transport.submitted_count().await, submitted);
    }

    #[tokio::test]
    async fn test_network_failure_is_retryable_and_changes_nothing() {
        let h = Harness::new().await;
        let user = Pubkey::new_unique();
        h.transport.set_fail_submits(true);

        let err = h
            .client
            .deposit(&user, &Pubkey::new_unique(), "5")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NetworkFailure(_)));
        assert!(err.is_retryable());
        assert!(h.client.user_state(&user).await.unwrap().is_none());

        h.transport.set_fail_submits(false);
        h.client
            .deposit(&user, &Pubkey::new_unique(), "5")
            .await
            .unwrap();
        assert_eq!(h.user(&user).await.deposited_amount, 5_000_000);
    }

    #[tokio::test]
    async fn test_lost_confirmation_is_unknown_not_failure() {
        let h = Harness::new().await;
        let user = Pubkey::new_unique();
        h.transport.set_drop_confirmations(true);

        let err = h
            .client
            .deposit(&user, &Pubkey::new_unique(), "5")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::OutcomeUnknown { .. }));
        assert!(!err.is_retryable());

        // the deposit did land; a caller must re-read before acting
        assert_eq!(h.user(&user).await.deposited_amount, 5_000_000);
    }

    #[tokio::test]
    async fn test_corrupt_account_is_schema_mismatch() {
        let h = Harness::new().await;
        let user = h.funded_user("1").await;
        let address = h.client.addresses().user_state(&user).address;

        let mut data = h.transport.account(&address).await.unwrap();
        data[0] ^= 0xff;
        h.transport.set_account(address, data).await;

        assert!(matches!(
            h.client.user_state(&user).await,
            Err(ClientError::SchemaMismatch {
                account: "UserState",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_complete_unknown_request() {
        let h = Harness::new().await;
        let user = h.funded_user("1").await;
        let err = h
            .client
            .complete_cross_chain_transfer(&h.authority, &BridgeRequestId::new(user, 0), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::AccountNotFound {
                kind: "BridgeRequest",
                ..
            }
        ));

        // per-user keying has no request beyond sequence 0
        let err = h
            .client
            .complete_cross_chain_transfer(&h.authority, &BridgeRequestId::new(user, 5), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidAddress { .. }));
    }
}

// ============================================================================
// Yield, Admin and Bridge Bookkeeping
// ============================================================================

mod admin_and_yield {
    use super::*;

    #[tokio::test]
    async fn test_claim_yield_after_one_day() {
        let h = Harness::new().await;
        h.client
            .update_yield_data(
                &h.authority,
                YieldRates {
                    solana: 520,
                    ethereum: 810,
                    polygon: 1230,
                },
            )
            .await
            .unwrap();
        let user = h.funded_user("100").await;

        assert!(matches!(
            h.client.claim_yield(&user, &Pubkey::new_unique()).await,
            Err(ClientError::NoYieldToClaim { .. })
        ));

        h.clock.advance(86_400);
        assert_eq!(h.client.pending_yield(&user).await.unwrap(), 14_246);
        let receipt = h
            .client
            .claim_yield(&user, &Pubkey::new_unique())
            .await
            .unwrap();
        assert_eq!(receipt.amount, 14_246);

        let state = h.user(&user).await;
        assert_eq!(state.total_yield_claimed, 14_246);
        assert_eq!(state.last_yield_claim, T0 + 86_400);
        assert_eq!(h.global().await.total_yield_earned, 14_246);
    }

    #[tokio::test]
    async fn test_set_authority_hands_over_admin() {
        let h = Harness::new().await;
        let successor = Pubkey::new_unique();
        h.client
            .set_authority(&h.authority, &successor)
            .await
            .unwrap();
        assert_eq!(h.global().await.authority, successor);

        let rates = YieldRates::default();
        assert!(matches!(
            h.client.update_yield_data(&h.authority, rates).await,
            Err(ClientError::Unauthorized { .. })
        ));
        h.client.update_yield_data(&successor, rates).await.unwrap();
    }

    #[tokio::test]
    async fn test_chain_yields_prefer_oracle() {
        let h = Harness::new().await;
        h.client
            .update_yield_data(
                &h.authority,
                YieldRates {
                    solana: 520,
                    ethereum: 810,
                    polygon: 1230,
                },
            )
            .await
            .unwrap();

        let mut oracle = OracleData::default();
        oracle.source_chain = 1;
        oracle.timestamp = T0;
        oracle.yield_rates[1] = 900; // Ethereum
        oracle.apy_data[1] = 940;
        oracle.yield_rates[4] = 1500; // Arbitrum
        h.client
            .update_oracle_data(&h.authority, oracle)
            .await
            .unwrap();

        let yields = h.client.chain_yields().await.unwrap();
        assert_eq!(yields.len(), 8);
        let by_id = |id: u8| yields.iter().find(|y| y.chain.id == id).unwrap();

        assert_eq!(by_id(1).rate_bps, 520);
        assert_eq!(by_id(2).rate_bps, 900);
        assert_eq!(by_id(2).apy_bps, 940);
        assert_eq!(by_id(3).rate_bps, 1230);
        assert_eq!(by_id(5).rate_bps, 1500);
        assert_eq!(by_id(5).apy_bps, 1500);
        assert_eq!(by_id(8).rate_bps, 0);
        assert_eq!(h.global().await.last_oracle_update, T0);
    }

    #[tokio::test]
    async fn test_oracle_update_rejects_unknown_source() {
        let h = Harness::new().await;
        let mut oracle = OracleData::default();
        oracle.source_chain = 0;
        assert_eq!(
            h.client
                .update_oracle_data(&h.authority, oracle)
                .await
                .unwrap_err(),
            ClientError::UnsupportedChain { chain_id: 0 }
        );
    }

    #[tokio::test]
    async fn test_requests_are_sequenced_per_user() {
        let h = Harness::sequenced().await;
        let alice = h.funded_user("100").await;
        let bob = h.funded_user("100").await;

        for _ in 0..3 {
            h.client
                .initiate_cross_chain_transfer(&alice, 2, "10", EVM_TARGET)
                .await
                .unwrap();
        }
        let solana_target = Pubkey::new_unique().to_string();
        h.client
            .initiate_cross_chain_transfer(&bob, 1, "5", &solana_target)
            .await
            .unwrap();

        let alice_requests = h.client.bridge_requests(&alice).await.unwrap();
        assert_eq!(alice_requests.len(), 3);
        for (index, (id, _)) in alice_requests.iter().enumerate() {
            assert_eq!(id.sequence, index as u64);
        }
        assert_eq!(h.client.next_bridge_sequence(&alice).await.unwrap(), 3);
        assert_eq!(h.client.bridge_requests(&bob).await.unwrap().len(), 1);

        // earmarked funds are unavailable until completion
        assert!(matches!(
            h.client
                .withdraw(&alice, &Pubkey::new_unique(), "71")
                .await,
            Err(ClientError::InsufficientBalance {
                available: 70_000_000,
                ..
            })
        ));
        h.client
            .complete_cross_chain_transfer(&h.authority, &alice_requests[0].0, false)
            .await
            .unwrap();
        h.client
            .withdraw(&alice, &Pubkey::new_unique(), "80")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_record_processing_is_local() {
        let h = Harness::new().await;
        let user = h.funded_user("100").await;
        h.client
            .initiate_cross_chain_transfer(&user, 2, "10", EVM_TARGET)
            .await
            .unwrap();
        let id = BridgeRequestId::new(user, 0);

        let local = h.client.record_processing(&id).await.unwrap();
        assert_eq!(local.status, BridgeStatus::Processing);
        let stored = h.client.bridge_request(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, BridgeStatus::Pending);
    }

    #[tokio::test]
    async fn test_accounts_carry_their_discriminators() {
        let h = Harness::new().await;
        let address = h.client.addresses().global_state().address;
        let data = h.transport.account(&address).await.unwrap();
        assert_eq!(data[..8], GlobalState::discriminator());
        assert_eq!(data.len(), GlobalState::LEN);
    }
}

// ============================================================================
// Bridge Request Keying
// ============================================================================

mod keying {
    use super::*;

    #[tokio::test]
    async fn test_default_request_lives_at_program_seeds() {
        let h = Harness::new().await;
        let user = h.funded_user("100").await;
        h.client
            .initiate_cross_chain_transfer(&user, 2, "25", EVM_TARGET)
            .await
            .unwrap();

        let program_id = h.client.context().program_id;
        let (expected, bump) =
            Pubkey::find_program_address(&[b"bridge_request", user.as_ref()], &program_id);
        let data = h.transport.account(&expected).await.unwrap();
        let stored = xchain_yield::BridgeRequest::decode(&data).unwrap();
        assert_eq!(stored.amount, 25_000_000);
        assert_eq!(stored.bump, bump);
        assert_eq!(
            h.client
                .bridge_request(&BridgeRequestId::new(user, 0))
                .await
                .unwrap(),
            Some(stored)
        );
    }

    #[tokio::test]
    async fn test_second_request_is_refused_before_submission() {
        let h = Harness::new().await;
        let user = h.funded_user("100").await;
        let receipt = h
            .client
            .initiate_cross_chain_transfer(&user, 2, "25", EVM_TARGET)
            .await
            .unwrap();
        let (id, _) = receipt.bridge.unwrap();
        let address = h.client.addresses().bridge_request(&user).address;

        let submitted = h.transport.submitted_count().await;
        let global = h.global().await;
        let err = h
            .client
            .initiate_cross_chain_transfer(&user, 2, "10", EVM_TARGET)
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::BridgeRequestExists { address });
        assert_eq!(h.transport.submitted_count().await, submitted);
        assert_eq!(h.global().await, global);

        // the account outlives completion, so the user stays at one request
        h.client
            .complete_cross_chain_transfer(&h.authority, &id, true)
            .await
            .unwrap();
        assert!(matches!(
            h.client.next_bridge_sequence(&user).await,
            Err(ClientError::BridgeRequestExists { .. })
        ));
        assert_eq!(h.client.bridge_requests(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sequenced_requests_use_their_own_seeds() {
        let h = Harness::sequenced().await;
        let user = h.funded_user("100").await;
        for _ in 0..2 {
            h.client
                .initiate_cross_chain_transfer(&user, 2, "10", EVM_TARGET)
                .await
                .unwrap();
        }

        let program_id = h.client.context().program_id;
        let (per_user, _) =
            Pubkey::find_program_address(&[b"bridge_request", user.as_ref()], &program_id);
        assert!(h.transport.account(&per_user).await.is_none());
        for sequence in 0u64..2 {
            let (address, _) = Pubkey::find_program_address(
                &[b"bridge_request", user.as_ref(), &sequence.to_le_bytes()],
                &program_id,
            );
            assert!(h.transport.account(&address).await.is_some());
        }
        assert_eq!(h.client.next_bridge_sequence(&user).await.unwrap(), 2);
    }
}
