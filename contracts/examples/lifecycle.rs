//! Walkthrough of a master vault's life: definition, a 2-of-3 standard
//! spend, a refused over-cap spend, a due recurring payment with its
//! successor vault, and an emergency withdrawal that needs every signer.
//!
//! Run with:
//!   cargo run -p vaultline-contracts --example lifecycle --release

use std::time::Instant;

use vaultline_contracts::{
    plan_and_build, verify_proposal, BuildRequest, RecurringPayment, SpendFunction, Vault,
    VaultConfig, VaultKind, VaultRegistry,
};
use vaultline_protocol::config::BuilderParams;
use vaultline_protocol::crypto::{PubkeyHash, VaultKeypair};
use vaultline_protocol::policy::SignerSlot;
use vaultline_protocol::transaction::{sign_vault_input, BuiltTransaction, ChainTip};
use vaultline_protocol::value::{LockingCommitment, OutPoint, TxOutput, Utxo};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn section(num: u32, title: &str) {
    println!();
    println!(
        "{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]========================================{RESET}"
    );
    println!("{BOLD}{WHITE}  {title}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn refused(text: &str) {
    println!("{RED}  [NO] {text}{RESET}");
}

fn info(label: &str, value: &str) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn timing(label: &str, elapsed: std::time::Duration) {
    let ms = elapsed.as_secs_f64() * 1000.0;
    println!("{DIM}{MAGENTA}  [{label}: {ms:.3} ms]{RESET}");
}

fn outputs(built: &BuiltTransaction) {
    for (i, o) in built.proposal.outputs.iter().enumerate() {
        println!("{DIM}  out[{i}] {:>9} sat -> {}{RESET}", o.value, &o.commitment.to_hex()[..16]);
    }
    info("Fee", &format!("{} sat over {} bytes", built.fee, built.size));
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let height = 850_000;
    let tip = ChainTip::at_height(height);
    let params = BuilderParams::default();
    let signers = [
        VaultKeypair::from_seed(&[1; 32]),
        VaultKeypair::from_seed(&[2; 32]),
        VaultKeypair::from_seed(&[3; 32]),
    ];
    let payee = VaultKeypair::from_seed(&[9; 32]);
    let merchant = PubkeyHash::from_bytes([0xde; 20]);
    let to_merchant = LockingCommitment::p2pkh(&merchant);

    // -----------------------------------------------------------------------
    // Step 1: Definition
    // -----------------------------------------------------------------------

    section(1, "Master vault definition");
    let vault = Vault::new(
        VaultKind::Master,
        VaultConfig::multisig(
            [
                signers[0].pubkey_hash(),
                signers[1].pubkey_hash(),
                signers[2].pubkey_hash(),
            ],
            2,
        )
        .with_spend_cap(500_000)
        .with_recurring(RecurringPayment {
            payee: payee.pubkey_hash(),
            amount: 50_000,
            next_due: 800_000,
            interval_blocks: 4_320,
        })
        .with_whitelist(merchant),
    )
    .expect("valid master vault");

    info("Commitment", &vault.commitment().to_hex());
    for (selector, function) in vault.functions().iter().enumerate() {
        println!("{DIM}  selector {selector}: {function}{RESET}");
    }

    let mut registry = VaultRegistry::new();
    registry.insert(vault.clone());
    let utxo = Utxo::new(
        OutPoint::new([0x11; 32], 0),
        TxOutput::new(1_000_000, vault.commitment()),
    );
    success("Vault registered with a 1,000,000 sat UTXO");

    // -----------------------------------------------------------------------
    // Step 2: Standard spend, signers 1 and 2
    // -----------------------------------------------------------------------

    section(2, "Standard spend: 200,000 sat with signers 1 and 2");
    let t = Instant::now();
    let mut built = plan_and_build(
        &vault,
        SpendFunction::StandardSpend,
        &utxo,
        &BuildRequest::payout(200_000, to_merchant.clone()).with_mask(0b011),
        tip,
        &params,
    )
    .expect("standard spend builds");
    timing("plan + fee loop", t.elapsed());
    outputs(&built);

    sign_vault_input(&mut built.proposal, 0, SignerSlot::First, &signers[0]).expect("sign");
    sign_vault_input(&mut built.proposal, 0, SignerSlot::Second, &signers[1]).expect("sign");

    let t = Instant::now();
    let evaluations = verify_proposal(&built.proposal, &registry, tip).expect("accepted");
    timing("verify", t.elapsed());
    info("Branch", &format!("{:?}", evaluations[0].branch));
    success("Predicate accepted the 2-of-3 spend");

    // -----------------------------------------------------------------------
    // Step 3: Over the cap
    // -----------------------------------------------------------------------

    section(3, "Standard spend above the 500,000 sat cap");
    match plan_and_build(
        &vault,
        SpendFunction::StandardSpend,
        &utxo,
        &BuildRequest::payout(600_000, to_merchant.clone()),
        tip,
        &params,
    ) {
        Ok(_) => panic!("over-cap spend must not build"),
        Err(e) => refused(&e.to_string()),
    }

    // -----------------------------------------------------------------------
    // Step 4: Recurring payment
    // -----------------------------------------------------------------------

    section(4, "Recurring payment, due since height 800,000");
    let built = plan_and_build(
        &vault,
        SpendFunction::ExecuteRecurring,
        &utxo,
        &BuildRequest::default(),
        tip,
        &params,
    )
    .expect("due payment builds");
    outputs(&built);
    verify_proposal(&built.proposal, &registry, tip).expect("anyone may execute");
    success("Executed without any signature");

    let successor = vault.successor_after_payment().expect("successor");
    info("Successor", &successor.commitment().to_hex());
    info(
        "Next due",
        &format!("{:?}", successor.config.recurring.map(|r| r.next_due)),
    );

    // -----------------------------------------------------------------------
    // Step 5: Emergency withdrawal
    // -----------------------------------------------------------------------

    section(5, "Emergency withdrawal");
    let mut built = plan_and_build(
        &vault,
        SpendFunction::EmergencyWithdraw,
        &utxo,
        &BuildRequest::drain(to_merchant),
        tip,
        &params,
    )
    .expect("drain builds");
    outputs(&built);

    sign_vault_input(&mut built.proposal, 0, SignerSlot::First, &signers[0]).expect("sign");
    sign_vault_input(&mut built.proposal, 0, SignerSlot::Second, &signers[1]).expect("sign");
    match verify_proposal(&built.proposal, &registry, tip) {
        Ok(_) => panic!("two signers must not be enough"),
        Err(e) => refused(&format!("{e} ({})", e.class())),
    }

    sign_vault_input(&mut built.proposal, 0, SignerSlot::Third, &signers[2]).expect("sign");
    verify_proposal(&built.proposal, &registry, tip).expect("all three signed");
    success("Accepted once every enabled signer signed");
    println!();
}
