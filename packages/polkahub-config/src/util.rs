use crate::error::Result;
use url::Url;

/// Swaps the scheme of an rpc endpoint between its websocket and http flavours
/// e.g. `wss://rpc.polkadot.io` becomes `https://rpc.polkadot.io/`
pub fn set_scheme_in_url(input_url: &str, secure_http: bool, websocket: bool) -> Result<String> {
    let mut url = Url::parse(input_url)?;

    let scheme = match (websocket, secure_http) {
        (true, true) => "wss",
        (true, false) => "ws",
        (false, true) => "https",
        (false, false) => "http",
    };

    // `Url::set_scheme` refuses to change between "special" schemes of different kinds,
    // all four of these are special so it's fine, but make sure we notice if it's not
    if url.set_scheme(scheme).is_err() {
        return Err(crate::ConfigError::Other(format!(
            "cannot change scheme of {input_url} to {scheme}"
        )));
    }

    Ok(url.to_string())
}

/// Both the http and websocket endpoints for an rpc url, keeping its TLS-ness
pub fn rpc_url_pair(rpc_url: &str) -> Result<(String, String)> {
    let secure = rpc_url.starts_with("wss://") || rpc_url.starts_with("https://");
    Ok((
        set_scheme_in_url(rpc_url, secure, false)?,
        set_scheme_in_url(rpc_url, secure, true)?,
    ))
}

/// CAIP-13 chain reference: the first 32 hex chars of the genesis hash, without `0x`
/// https://github.com/ChainAgnostic/CAIPs/blob/main/CAIPs/caip-13.md
pub fn caip_chain_reference(genesis: &str) -> String {
    let genesis = genesis.strip_prefix("0x").unwrap_or(genesis);
    genesis.chars().take(32).collect()
}

pub fn caip_network_id(genesis: &str) -> String {
    format!("polkadot:{}", caip_chain_reference(genesis))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn swaps_schemes() {
        let (http, ws) = rpc_url_pair("wss://rpc.polkadot.io").unwrap();
        assert_eq!(http, "https://rpc.polkadot.io/");
        assert_eq!(ws, "wss://rpc.polkadot.io/");

        let (http, ws) = rpc_url_pair("http://localhost:9944").unwrap();
        assert_eq!(http, "http://localhost:9944/");
        assert_eq!(ws, "ws://localhost:9944/");
    }

    #[test]
    fn caip_ids() {
        let genesis = "0x91b171bb158e2d3848fa23a9f1c25182fb8e20313b2c1eb49219da7a70ce90c3";
        assert_eq!(
            caip_network_id(genesis),
            "polkadot:91b171bb158e2d3848fa23a9f1c25182"
        );
        assert_eq!(
            caip_chain_reference("91b171bb158e2d3848fa23a9f1c25182"),
            "91b171bb158e2d3848fa23a9f1c25182"
        );
    }
}
