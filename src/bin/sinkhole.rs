use colored::Colorize;
use oubliette_dns::shared::log::{init_log, set_max_level};
use oubliette_dns::shared::net::*;
use oubliette_dns::sinkhole::conf;
use oubliette_dns::sinkhole::*;
use std::sync::{Arc, RwLock};
use std::{env, process, time};

fn main() {
    init_log();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        print_usage();
        process::exit(1);
    }

    let conf = match conf::Conf::from_file(&args[1]) {
        Ok(conf) => {
            set_max_level(conf.log_level);
            log::info!("Parsed configuration: {:?}.", conf);
            conf
        }
        Err(err) => {
            log::error!("Parsing configuration file: {}", err);
            process::exit(1);
        }
    };

    // Build the policy tries from the configured lists. The dump lines
    // give operators a full view of the loaded policies.
    let (whitelist, blacklist) = match conf::build_tries(&conf.sinkhole) {
        Ok(v) => v,
        Err(err) => {
            log::error!("Building policy tries: {}", err);
            process::exit(1);
        }
    };
    for line in whitelist.dump() {
        log::debug!("whitelist: {}", line);
    }
    for line in blacklist.dump() {
        log::debug!("blacklist: {}", line);
    }
    let whitelist = Arc::new(RwLock::new(whitelist));
    let blacklist = Arc::new(RwLock::new(blacklist));

    // Instantiate the upstream resolver shared by the handlers. The
    // address was validated while parsing the configuration.
    let upstream_params = UpstreamParams {
        address: conf.sinkhole.upstream.address.parse().unwrap(),
        port: conf.sinkhole.upstream.port,
        retries: conf.sinkhole.upstream.retries,
        timeout: time::Duration::new(conf.sinkhole.upstream.timeout, 0),
    };
    let upstream: Arc<dyn UpstreamResolver> = Arc::new(UdpUpstream::new(upstream_params));

    // Assemble the handler chain in the mandated order (whitelist,
    // blacklist, recursive), the censoring step and the pipeline.
    let handlers: Vec<Box<dyn PolicyHandler>> = vec![
        Box::new(WhitelistHandler::new(Arc::clone(&whitelist), Arc::clone(&upstream))),
        Box::new(BlacklistHandler::new(Arc::clone(&blacklist))),
        Box::new(RecursiveHandler::new(Arc::clone(&upstream))),
    ];
    let chain = HandlerChain::new(handlers);
    let censor_params = CensorParams {
        auto_whitelist: conf.sinkhole.auto_whitelist,
        auto_blacklist: conf.sinkhole.auto_blacklist,
    };
    let censor = Censor::new(whitelist, blacklist, censor_params);
    let deadline = time::Duration::new(conf.sinkhole.query_deadline, 0);
    let pipeline = QueryPipeline::new(chain, censor, deadline);
    let handler_ptr = Arc::new(SinkholeHandler(pipeline));

    // Start the servers.
    let udp_params = UdpParams {
        address: conf.udp_server.address,
        port: conf.udp_server.port,
        write_timeout: time::Duration::new(conf.udp_server.write_timeout, 0),
        threads: conf.udp_server.threads,
    };
    let tcp_params = TcpParams {
        address: conf.tcp_server.address,
        port: conf.tcp_server.port,
        write_timeout: time::Duration::new(conf.tcp_server.write_timeout, 0),
        read_timeout: time::Duration::new(conf.tcp_server.read_timeout, 0),
        threads: conf.tcp_server.threads,
    };

    start_servers(handler_ptr, udp_params, tcp_params);
}

fn print_usage() {
    log::error!(
        "One argument should be provided when starting the sinkhole: the path of the configuration file.
Usage: {} {}",
        "path/to/sinkhole/binary".bold(),
        "path/to/config/file".bold().bright_green()
    )
}
