/// Amounts are denominated in the base ledger's smallest unit.
pub type Wei = u128;

pub const WEI_PER_ETHER: Wei = 1_000_000_000_000_000_000;

pub const fn ether_fraction(numerator: u128, denominator: u128) -> Wei {
    WEI_PER_ETHER * numerator / denominator
}

pub const MAX_REQUESTS: u64 = 1_000;
pub const NRE_LENGTH: u64 = 2;

pub const COST_ERO: Wei = ether_fraction(1, 10);
pub const COST_ERU: Wei = ether_fraction(2, 10);
pub const COST_URB_PREPARE: Wei = ether_fraction(1, 10);
pub const COST_URB: Wei = ether_fraction(9, 10);
pub const COST_ORB: Wei = ether_fraction(1, 10);
pub const COST_NRB: Wei = ether_fraction(1, 10);

// Challenge windows, in seconds.
pub const CP_COMPUTATION: u64 = 15;
pub const CP_WITHHOLDING: u64 = 20;

pub const PREPARE_TIMEOUT: u64 = 60;
pub const OPERATOR_TIMEOUT: u64 = 30;

pub const MAX_FINALIZATION_STEPS: u64 = 64;

#[derive(Clone, Debug)]
pub struct ChainParams {
    pub max_requests: u64,
    pub nre_length: u64,
    pub cost_ero: Wei,
    pub cost_eru: Wei,
    pub cost_urb_prepare: Wei,
    pub cost_urb: Wei,
    pub cost_orb: Wei,
    pub cost_nrb: Wei,
    pub cp_computation: u64,
    pub cp_withholding: u64,
    pub prepare_timeout: u64,
    pub operator_timeout: u64,
    pub max_finalization_steps: u64,
}

pub const DEVNET_PARAMS: ChainParams = ChainParams {
    max_requests: MAX_REQUESTS,
    nre_length: NRE_LENGTH,
    cost_ero: COST_ERO,
    cost_eru: COST_ERU,
    cost_urb_prepare: COST_URB_PREPARE,
    cost_urb: COST_URB,
    cost_orb: COST_ORB,
    cost_nrb: COST_NRB,
    cp_computation: CP_COMPUTATION,
    cp_withholding: CP_WITHHOLDING,
    prepare_timeout: PREPARE_TIMEOUT,
    operator_timeout: OPERATOR_TIMEOUT,
    max_finalization_steps: MAX_FINALIZATION_STEPS,
};
