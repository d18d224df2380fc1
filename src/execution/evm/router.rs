//! The execution orchestrator.
//!
//! A top-level call runs its instructions in order inside one transaction: the host world, the fee
//! ledger and the event log are snapshotted first and restored if any step fails, so a call either
//! lands completely or has no effect at all.

use alloy_primitives::{Address, U256};
use tracing::{debug, info, warn};

use crate::execution::{
    command::{AdapterId, Command},
    errors::ExecutionError,
    evm::{
        adapters::{
            adapter_registry::AdapterRegistry, check_amount_out, AdapterContext, Instruction,
        },
        host::Host,
    },
    ledger::FeeLedger,
    models::{
        AmountOverride, Chain, ExecutionReport, Invocation, Outcome, RouterEvent, StepReport,
    },
};

/// Per-call state threaded between instructions.
#[derive(Debug, Default)]
struct Session {
    /// Attached native value not yet spent.
    budget: U256,
    /// Output of the previous instruction when it was chained.
    pending: Option<AmountOverride>,
    /// Input of the current chain of instructions, reported in the `Warp` record.
    origin: Option<(Address, U256)>,
}

impl Session {
    fn spend_native(&mut self, amount: U256) -> Result<(), ExecutionError> {
        if self.budget < amount {
            return Err(ExecutionError::InvalidInput(format!(
                "Attached value {} does not cover {} of native currency",
                self.budget, amount
            )));
        }
        self.budget -= amount;
        Ok(())
    }
}

/// Routes byte-packed instructions to the registered adapters.
pub struct WarpRouter {
    chain: Chain,
    address: Address,
    owner: Address,
    wrapped_native: Address,
    registry: AdapterRegistry,
    ledger: FeeLedger,
    events: Vec<RouterEvent>,
}

impl WarpRouter {
    pub(crate) fn new(
        chain: Chain,
        address: Address,
        owner: Address,
        wrapped_native: Address,
        registry: AdapterRegistry,
        ledger: FeeLedger,
    ) -> Self {
        Self { chain, address, owner, wrapped_native, registry, ledger, events: Vec::new() }
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn wrapped_native(&self) -> Address {
        self.wrapped_native
    }

    pub fn ledger(&self) -> &FeeLedger {
        &self.ledger
    }

    /// Records emitted so far, oldest first.
    pub fn events(&self) -> &[RouterEvent] {
        &self.events
    }

    pub fn supported_adapters(&self) -> Vec<AdapterId> {
        self.registry.supported()
    }

    /// Executes a single instruction.
    pub fn execute_one(
        &mut self,
        host: &mut Host,
        invocation: &Invocation,
        command: [u8; 3],
        payload: &[u8],
    ) -> Result<ExecutionReport, ExecutionError> {
        self.execute_many(host, invocation, &[command], &[payload])
    }

    /// Executes `(commands[i], payloads[i])` in order as one atomic operation.
    ///
    /// The output of an instruction whose command carries the chain flag becomes the amount-in of
    /// the next instruction instead of being delivered. Unused attached value is refunded to the
    /// sender.
    pub fn execute_many<P: AsRef<[u8]>>(
        &mut self,
        host: &mut Host,
        invocation: &Invocation,
        commands: &[[u8; 3]],
        payloads: &[P],
    ) -> Result<ExecutionReport, ExecutionError> {
        if commands.is_empty() {
            return Err(ExecutionError::InvalidInput("No instructions to execute".to_string()));
        }
        if commands.len() != payloads.len() {
            return Err(ExecutionError::InvalidInput(format!(
                "Got {} commands but {} payloads",
                commands.len(),
                payloads.len()
            )));
        }
        info!(
            sender = %invocation.sender,
            value = %invocation.value,
            instructions = commands.len(),
            "Executing instructions"
        );
        self.transact(host, |router, host| router.run(host, invocation, commands, payloads))
    }

    fn run<P: AsRef<[u8]>>(
        &mut self,
        host: &mut Host,
        invocation: &Invocation,
        commands: &[[u8; 3]],
        payloads: &[P],
    ) -> Result<ExecutionReport, ExecutionError> {
        if !invocation.value.is_zero() {
            host.world_mut()
                .transfer(Address::ZERO, invocation.sender, self.address, invocation.value)
                .map_err(|e| e.into_execution_error(self.address))?;
        }
        let mut session = Session { budget: invocation.value, ..Default::default() };
        let mut report = ExecutionReport::default();
        let last = commands.len() - 1;
        for (position, (bytes, payload)) in commands
            .iter()
            .zip(payloads)
            .enumerate()
        {
            let command = Command::decode(*bytes);
            let step = self.step(
                host,
                invocation,
                &command,
                payload.as_ref(),
                position == last,
                &mut session,
            )?;
            report.steps.push(step);
        }

        if !session.budget.is_zero() {
            host.world_mut()
                .transfer(Address::ZERO, self.address, invocation.sender, session.budget)
                .map_err(|e| e.into_execution_error(invocation.sender))?;
            debug!(amount = %session.budget, "Refunded unused value");
        }
        report.refunded = session.budget;
        Ok(report)
    }

    fn step(
        &mut self,
        host: &mut Host,
        invocation: &Invocation,
        command: &Command,
        payload: &[u8],
        is_last: bool,
        session: &mut Session,
    ) -> Result<StepReport, ExecutionError> {
        let adapter = self.registry.get(command.selector)?;
        let id = adapter.id();
        if command.chained && id.is_bridge() {
            return Err(ExecutionError::InvalidInput(format!(
                "{} bridges produce no output to chain",
                id
            )));
        }
        if command.chained && is_last {
            return Err(ExecutionError::InvalidInput(
                "The last instruction cannot be chained".to_string(),
            ));
        }

        let pending = session.pending.take();
        let instruction = adapter.decode(command, payload, pending.map(|chained| chained.amount))?;
        let asset_in = instruction.asset_in();
        let amount_in = instruction.amount_in();
        match pending {
            Some(chained) if chained.asset != asset_in => {
                return Err(ExecutionError::InvalidInput(format!(
                    "Chained output of {} cannot fund an input of {}",
                    chained.asset, asset_in
                )));
            }
            Some(_) => debug!(adapter = %id, %asset_in, %amount_in, "Using chained amount"),
            None => {
                self.fund(host, invocation.sender, session, asset_in, amount_in)?;
                session.origin = Some((asset_in, amount_in));
            }
        }
        let native_fee = instruction.native_fee();
        if !native_fee.is_zero() {
            session.spend_native(native_fee)?;
        }

        debug!(adapter = %id, chained = command.chained, %asset_in, %amount_in, "Dispatching");
        let mut ctx = AdapterContext::new(host, self.address, invocation.sender, self.wrapped_native);
        let outcome = adapter.call(&instruction, &mut ctx)?;

        let delivered = match outcome {
            Outcome::Swapped { asset_out, amount_out } if command.chained => {
                session.pending = Some(AmountOverride { asset: asset_out, amount: amount_out });
                None
            }
            Outcome::Swapped { asset_out, amount_out } => {
                let (origin_asset, origin_amount) =
                    session.origin.unwrap_or((asset_in, amount_in));
                let net = self.deliver(host, invocation, &instruction, asset_out, amount_out)?;
                self.events.push(RouterEvent::Warp {
                    asset_in: origin_asset,
                    asset_out,
                    amount_in: origin_amount,
                    amount_out: net,
                });
                Some(net)
            }
            Outcome::Bridged => None,
        };
        Ok(StepReport {
            adapter: id,
            chained: command.chained,
            asset_in,
            amount_in,
            outcome,
            delivered,
        })
    }

    /// Puts `amount` of `asset` in router custody.
    ///
    /// Native currency comes from the attached value; the wrapped-native asset is wrapped from it
    /// when the attached value covers the amount; everything else is pulled from the sender
    /// through its allowance.
    fn fund(
        &self,
        host: &mut Host,
        sender: Address,
        session: &mut Session,
        asset: Address,
        amount: U256,
    ) -> Result<(), ExecutionError> {
        if asset == Address::ZERO {
            return session.spend_native(amount);
        }
        if asset == self.wrapped_native && !amount.is_zero() && session.budget >= amount {
            session.spend_native(amount)?;
            return AdapterContext::new(host, self.address, sender, self.wrapped_native).wrap(amount);
        }
        host.world_mut()
            .transfer_from(asset, self.address, sender, self.address, amount)
            .map_err(|e| e.into_execution_error(asset))
    }

    /// Takes fees from a gross swap output and sends the rest to the recipient.
    fn deliver(
        &mut self,
        host: &mut Host,
        invocation: &Invocation,
        instruction: &Instruction,
        asset_out: Address,
        gross: U256,
    ) -> Result<U256, ExecutionError> {
        let partner = invocation
            .partner
            .filter(|partner| self.ledger.partner(partner).is_some());
        let split = self.ledger.quote(gross, partner);
        check_amount_out(split.net, instruction.amount_out_min())?;
        self.ledger
            .accrue(asset_out, partner, &split);

        let recipient = instruction
            .recipient()
            .unwrap_or(invocation.sender);
        host.world_mut()
            .transfer(asset_out, self.address, recipient, split.net)
            .map_err(|e| e.into_execution_error(recipient))?;

        self.events.push(RouterEvent::Fee {
            asset: asset_out,
            partner: partner.unwrap_or_default(),
            protocol_fee: split.protocol_fee,
            partner_fee: split.partner_fee,
        });
        info!(
            %asset_out,
            %gross,
            net = %split.net,
            protocol_fee = %split.protocol_fee,
            partner_fee = %split.partner_fee,
            %recipient,
            "Delivered swap output"
        );
        Ok(split.net)
    }

    /// Runs `f` against a snapshot of the host, the ledger and the event log, restoring all three
    /// if it fails.
    fn transact<T, F>(&mut self, host: &mut Host, f: F) -> Result<T, ExecutionError>
    where
        F: FnOnce(&mut Self, &mut Host) -> Result<T, ExecutionError>,
    {
        let world = host.snapshot();
        let ledger = self.ledger.clone();
        let events = self.events.len();
        let result = f(self, host);
        if let Err(err) = &result {
            warn!(error = %err, "Reverting call");
            host.restore(world);
            self.ledger = ledger;
            self.events.truncate(events);
        }
        result
    }

    fn only_owner(&self, caller: Address) -> Result<(), ExecutionError> {
        if caller != self.owner {
            return Err(ExecutionError::Unauthorized(caller));
        }
        Ok(())
    }

    /// Sends the router's balance of `asset` in excess of accrued fees to `to`.
    fn sweep(&self, host: &mut Host, asset: Address, to: Address) -> Result<U256, ExecutionError> {
        let balance = host
            .world()
            .balance_of(asset, self.address);
        let excess = balance.saturating_sub(self.ledger.liabilities(&asset));
        if !excess.is_zero() {
            host.world_mut()
                .transfer(asset, self.address, to, excess)
                .map_err(|e| e.into_execution_error(to))?;
            info!(%asset, amount = %excess, %to, "Swept stuck balance");
        }
        Ok(excess)
    }

    /// Sweeps stuck balances of `assets` to `to`. Accrued fees are not touched.
    pub fn withdraw_asset(
        &mut self,
        host: &mut Host,
        caller: Address,
        assets: &[Address],
        to: Address,
    ) -> Result<Vec<U256>, ExecutionError> {
        self.only_owner(caller)?;
        self.transact(host, |router, host| {
            assets
                .iter()
                .map(|asset| router.sweep(host, *asset, to))
                .collect()
        })
    }

    /// Sweeps stuck native currency to `to`. Accrued native fees are not touched.
    pub fn withdraw_native(
        &mut self,
        host: &mut Host,
        caller: Address,
        to: Address,
    ) -> Result<U256, ExecutionError> {
        self.only_owner(caller)?;
        self.transact(host, |router, host| router.sweep(host, Address::ZERO, to))
    }

    /// Sends the accrued protocol share of `assets` to `to`.
    pub fn withdraw_protocol_fees(
        &mut self,
        host: &mut Host,
        caller: Address,
        assets: &[Address],
        to: Address,
    ) -> Result<Vec<U256>, ExecutionError> {
        self.only_owner(caller)?;
        self.transact(host, |router, host| {
            let mut amounts = Vec::with_capacity(assets.len());
            for asset in assets {
                let amount = router.ledger.withdraw_protocol(*asset);
                if !amount.is_zero() {
                    host.world_mut()
                        .transfer(*asset, router.address, to, amount)
                        .map_err(|e| e.into_execution_error(to))?;
                    info!(%asset, %amount, %to, "Withdrew protocol fees");
                }
                amounts.push(amount);
            }
            Ok(amounts)
        })
    }

    /// Sends the caller's accrued partner share of `assets` to `to`.
    pub fn withdraw_partner_fees(
        &mut self,
        host: &mut Host,
        caller: Address,
        assets: &[Address],
        to: Address,
    ) -> Result<Vec<U256>, ExecutionError> {
        if self.ledger.partner(&caller).is_none() {
            return Err(ExecutionError::Unauthorized(caller));
        }
        self.transact(host, |router, host| {
            let mut amounts = Vec::with_capacity(assets.len());
            for asset in assets {
                let amount = router
                    .ledger
                    .withdraw_partner(caller, *asset);
                if !amount.is_zero() {
                    host.world_mut()
                        .transfer(*asset, router.address, to, amount)
                        .map_err(|e| e.into_execution_error(to))?;
                    router.events.push(RouterEvent::Withdrawal {
                        asset: *asset,
                        partner: caller,
                        amount,
                    });
                    info!(partner = %caller, %asset, %amount, "Withdrew partner fees");
                }
                amounts.push(amount);
            }
            Ok(amounts)
        })
    }

    pub fn register_partner(
        &mut self,
        caller: Address,
        partner: Address,
        fee_bps: u16,
    ) -> Result<(), ExecutionError> {
        self.only_owner(caller)?;
        self.ledger
            .register_partner(partner, fee_bps)?;
        info!(%partner, fee_bps, "Registered partner");
        Ok(())
    }

    pub fn set_protocol_fee(&mut self, caller: Address, fee_bps: u16) -> Result<(), ExecutionError> {
        self.only_owner(caller)?;
        self.ledger
            .set_protocol_fee_bps(fee_bps)?;
        info!(fee_bps, "Set protocol fee");
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), ExecutionError> {
        self.only_owner(caller)?;
        if new_owner == Address::ZERO {
            return Err(ExecutionError::InvalidInput("Owner cannot be the zero address".to_string()));
        }
        info!(previous = %self.owner, %new_owner, "Transferred ownership");
        self.owner = new_owner;
        Ok(())
    }
}
