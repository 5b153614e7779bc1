use serde::{Deserialize, Serialize};

/// Market indicators feeding the regime score. IV percentile and realized
/// vol are percents, FII net flow is in crores, the rest are raw values.
/// Vol forecasts come from the external statistical services; only their
/// numeric output enters here.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RegimeInputs {
    pub ivp: f64,
    pub vix: f64,
    pub pcr: f64,
    pub fii_net: f64,
    pub event_impact: f64,
    pub realized_vol: f64,
    pub iv_skew_slope: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegimeResult {
    pub regime_score: i32,
    pub regime: &'static str,
    pub explanation: Vec<String>,
}

/// Additive score over seven independent indicators. Within an indicator the
/// bands are mutually exclusive (highest matching band fires); across
/// indicators contributions add. Explanations accumulate in evaluation order,
/// one per band crossed.
pub fn classify_regime(inputs: &RegimeInputs) -> RegimeResult {
    let mut score = 0;
    let mut explanation = Vec::new();

    if inputs.ivp > 70.0 {
        score += 3;
        explanation.push("Very high IVP (>70%) indicates high option premiums.".to_string());
    } else if inputs.ivp > 50.0 {
        score += 2;
        explanation.push("High IVP (>50%) indicates elevated option premiums.".to_string());
    }

    if inputs.vix > 20.0 {
        score += 3;
        explanation.push("High VIX (>20) suggests significant market fear.".to_string());
    } else if inputs.vix > 14.0 {
        score += 2;
        explanation.push("Elevated VIX (>14) indicates increased volatility expectations.".to_string());
    }

    if inputs.pcr > 1.5 {
        score += 2;
        explanation.push(format!("Very bullish PCR ({}).", inputs.pcr));
    } else if inputs.pcr < 0.7 {
        score += 2;
        explanation.push(format!("Very bearish PCR ({}).", inputs.pcr));
    } else if (0.9..=1.1).contains(&inputs.pcr) {
        score += 1;
        explanation.push(format!("Neutral PCR ({}).", inputs.pcr));
    }

    if inputs.fii_net > 2000.0 {
        score += 2;
        explanation.push("Strong FII net long positioning (>2000 Cr).".to_string());
    } else if inputs.fii_net < -1000.0 {
        score += 2;
        explanation.push("Strong FII net short positioning (<-1000 Cr).".to_string());
    }

    if inputs.event_impact > 0.7 {
        score += 3;
        explanation.push("High event impact score (>0.7) indicates significant potential market moves.".to_string());
    } else if inputs.event_impact > 0.4 {
        score += 1;
        explanation.push("Moderate event impact score (>0.4).".to_string());
    }

    if inputs.realized_vol > 20.0 {
        score += 3;
        explanation.push("Very high realized volatility (>20%) indicates sharp price swings.".to_string());
    } else if inputs.realized_vol > 15.0 {
        score += 1;
        explanation.push("High realized volatility (>15%).".to_string());
    }

    if inputs.iv_skew_slope > 0.7 {
        score += 2;
        explanation.push("Steep IV skew slope (>0.7) suggests bearish sentiment (puts are expensive).".to_string());
    } else if inputs.iv_skew_slope < -0.3 {
        score += 1;
        explanation.push("Negative IV skew slope (<-0.3) suggests bullish sentiment (calls are expensive).".to_string());
    }

    RegimeResult {
        regime_score: score,
        regime: regime_label(score),
        explanation,
    }
}

/// Total order over the integer score; no ties possible.
fn regime_label(score: i32) -> &'static str {
    if score >= 10 {
        "High Volatility/Event Driven"
    } else if score >= 6 {
        "Trend-Following/Moderate Volatility"
    } else if score < 3 {
        "Low Volatility/Range-Bound"
    } else {
        "Uncertain/Volatile"
    }
}
