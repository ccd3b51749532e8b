use structopt::StructOpt;

use types::params::{DEFAULT_UTXO_GAS, PUB_NET_SIGN_PARAM};

#[derive(StructOpt, Clone, Debug, Eq, PartialEq)]
#[structopt(rename_all = "kebab-case", name = "TxPool")]
pub struct Config {
    /// Replay protection parameter of the chain
    #[structopt(long, default_value = "29153")]
    pub sign_param: u64,

    /// Admit transfers without a recipient
    #[structopt(long)]
    pub test_mode: bool,

    /// Gas charged for creating confidential outputs
    #[structopt(long, default_value = "500000")]
    pub utxo_gas: u64,

    /// Maximum number of pending transactions
    #[structopt(long, default_value = "4096")]
    pub mempool_size: usize,

    /// Keep a ledger of the balance movements of admitted transactions
    #[structopt(long)]
    pub record_balances: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sign_param: PUB_NET_SIGN_PARAM,
            test_mode: false,
            utxo_gas: DEFAULT_UTXO_GAS,
            mempool_size: 4096,
            record_balances: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_flags() {
        assert_eq!(Config::from_iter(&["txpool"]), Config::default());

        let config = Config::from_iter(&[
            "txpool",
            "--sign-param",
            "29154",
            "--test-mode",
            "--mempool-size",
            "2",
        ]);
        assert_eq!(config.sign_param, 29154);
        assert!(config.test_mode);
        assert_eq!(config.mempool_size, 2);
        assert_eq!(config.utxo_gas, DEFAULT_UTXO_GAS);
        assert!(!config.record_balances);
    }
}
