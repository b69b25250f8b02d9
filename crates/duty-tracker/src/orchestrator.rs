//! The loop that drives an operation from wherever it stands to completion.

use alloy_primitives::{utils::format_ether, B256, U256};
use portal_bridge_chain::{RollupEndpoint, SettlementEndpoint};
use portal_bridge_primitives::{
    params::ProtocolParams,
    types::{Direction, OperationRequest},
};
use portal_bridge_sm::{
    DepositCfg, DepositSM, OperationSM, StateMachine, WithdrawalCfg, WithdrawalSM,
};
use tracing::{debug, info};

use crate::{
    config::WaitPolicy,
    errors::OrchestratorErr,
    executor,
    persister::OperationPersister,
};

/// Runs bridge operations against a pair of chain endpoints.
///
/// Every transition is committed to the persister before the next duty
/// executes, so a crash at any point resumes into an await of whatever was
/// already submitted rather than a second submission.
#[derive(Debug)]
pub struct Orchestrator<L1, L2> {
    l1: L1,
    l2: L2,
    params: ProtocolParams,
    policy: WaitPolicy,
    persister: OperationPersister,
}

impl<L1, L2> Orchestrator<L1, L2>
where
    L1: SettlementEndpoint,
    L2: RollupEndpoint,
{
    /// Creates an orchestrator over the given endpoints.
    pub const fn new(
        l1: L1,
        l2: L2,
        params: ProtocolParams,
        policy: WaitPolicy,
        persister: OperationPersister,
    ) -> Self {
        Self {
            l1,
            l2,
            params,
            policy,
            persister,
        }
    }

    /// The settlement-chain endpoint.
    pub const fn l1(&self) -> &L1 {
        &self.l1
    }

    /// The rollup endpoint.
    pub const fn l2(&self) -> &L2 {
        &self.l2
    }

    /// The persister backing this orchestrator.
    pub const fn persister(&self) -> &OperationPersister {
        &self.persister
    }

    /// Fetches the signer balances on both chains and logs them.
    pub async fn signer_balances(&self) -> Result<(U256, U256), OrchestratorErr> {
        let l1_balance = self.l1.get_balance(self.l1.signer_address()).await?;
        let l2_balance = self.l2.get_balance(self.l2.signer_address()).await?;
        info!(
            signer = %self.l1.signer_address(),
            l1_balance = %format_ether(l1_balance),
            l2_balance = %format_ether(l2_balance),
            "signer balances"
        );
        Ok((l1_balance, l2_balance))
    }

    /// Starts a fresh operation and drives it to completion.
    pub async fn start(
        &self,
        id: &str,
        request: &OperationRequest,
    ) -> Result<OperationSM, OrchestratorErr> {
        let sm = match request.direction {
            Direction::Deposit => OperationSM::from(DepositSM::new(DepositCfg {
                amount: request.amount,
                recipient: request.recipient,
            })),
            Direction::Withdraw => OperationSM::from(WithdrawalSM::new(WithdrawalCfg {
                amount: request.amount,
                recipient: request.recipient,
            })),
        };

        info!(
            %id,
            direction = %request.direction,
            amount = %format_ether(request.amount),
            recipient = %request.recipient,
            "starting operation"
        );
        self.persister.init(id, &sm).await?;
        self.drive(id, sm).await
    }

    /// Adopts a withdrawal whose initiation was already submitted outside of
    /// any persisted run, identified by its rollup transaction hash, and
    /// drives it to completion. The initiation is never resubmitted.
    pub async fn adopt_withdrawal(
        &self,
        id: &str,
        request: &OperationRequest,
        initiation_txid: B256,
    ) -> Result<OperationSM, OrchestratorErr> {
        let sm = OperationSM::from(WithdrawalSM::with_known_initiation(
            WithdrawalCfg {
                amount: request.amount,
                recipient: request.recipient,
            },
            initiation_txid,
        ));

        info!(%id, %initiation_txid, "adopting already-initiated withdrawal");
        self.persister.init(id, &sm).await?;
        self.drive(id, sm).await
    }

    /// Resumes a persisted operation from wherever its last run stopped.
    pub async fn resume(&self, id: &str) -> Result<OperationSM, OrchestratorErr> {
        let sm = self.persister.load(id).await?;
        info!(%id, step = sm.step(), "resuming persisted operation");
        self.drive(id, sm).await
    }

    async fn drive(&self, id: &str, mut sm: OperationSM) -> Result<OperationSM, OrchestratorErr> {
        self.signer_balances().await?;

        while !sm.is_terminal() {
            match &mut sm {
                OperationSM::Deposit(dsm) => {
                    let Some(duty) = dsm.pending_duty() else {
                        return Err(OrchestratorErr::Fatal(format!(
                            "operation {id} stalled without a pending duty"
                        )));
                    };
                    debug!(%id, step = dsm.step(), ?duty, "executing duty");
                    let event = executor::execute_deposit_duty(
                        &self.l1,
                        &self.l2,
                        &self.params,
                        &self.policy,
                        duty,
                    )
                    .await?;
                    dsm.process_event(event)?;
                }
                OperationSM::Withdrawal(wsm) => {
                    let Some(duty) = wsm.pending_duty() else {
                        return Err(OrchestratorErr::Fatal(format!(
                            "operation {id} stalled without a pending duty"
                        )));
                    };
                    debug!(%id, step = wsm.step(), ?duty, "executing duty");
                    let event = executor::execute_withdrawal_duty(
                        &self.l1,
                        &self.l2,
                        &self.params,
                        &self.policy,
                        duty,
                    )
                    .await?;
                    wsm.process_event(event)?;
                }
            }

            self.persister.commit(id, &sm).await?;
            info!(%id, step = sm.step(), "operation advanced");
        }

        info!(%id, "operation complete");
        Ok(sm)
    }
}
