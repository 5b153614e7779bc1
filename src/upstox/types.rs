use serde::{Deserialize, Serialize};

// ── Option chain payload ──
//
// One record per strike. Either side may be absent for illiquid strikes;
// the zero-default policy is applied once, in chain::normalize, not here.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStrikeRecord {
    pub expiry: Option<String>,
    pub strike_price: f64,
    pub underlying_key: Option<String>,
    pub underlying_spot_price: Option<f64>,
    pub call_options: Option<SideRecord>,
    pub put_options: Option<SideRecord>,
    pub pcr: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SideRecord {
    pub instrument_key: Option<String>,
    pub market_data: Option<MarketData>,
    pub option_greeks: Option<OptionGreeks>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketData {
    pub ltp: Option<f64>,
    pub volume: Option<i64>,
    pub oi: Option<f64>,
    pub close_price: Option<f64>,
    pub bid_price: Option<f64>,
    pub bid_qty: Option<i64>,
    pub ask_price: Option<f64>,
    pub ask_qty: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionGreeks {
    pub vega: Option<f64>,
    pub theta: Option<f64>,
    pub gamma: Option<f64>,
    pub delta: Option<f64>,
    pub iv: Option<f64>,
    pub rho: Option<f64>,
}

// ── Responses ──

#[derive(Debug, Clone, Deserialize)]
pub struct OptionChainResponse {
    pub status: Option<String>,
    pub data: Option<Vec<RawStrikeRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractResponse {
    pub data: Option<Vec<Contract>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contract {
    pub instrument_key: Option<String>,
    pub expiry: Option<String>,
    pub strike_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderResponse {
    pub status: Option<String>,
    pub data: Option<OrderData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderData {
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FundsResponse {
    pub data: Option<FundsData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FundsData {
    pub equity: Option<MarginDetail>,
    pub commodity: Option<MarginDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarginDetail {
    pub available_margin: Option<f64>,
    pub used_margin: Option<f64>,
}

// ── Order submission ──

/// Wire payload for one leg order. Field names follow the broker contract.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub instrument_key: String,
    pub quantity: i64,
    pub product: String,
    pub order_type: String,
    pub transaction_type: String,
    pub price: f64,
    pub trigger_price: f64,
    pub disclosed_quantity: i64,
    pub validity: String,
    pub tag: String,
}
