mod common;

#[cfg(test)]
mod up_tests {
    use crate::common::{FakeRunner, Workspace};
    use fabnet::orchestrator::{Action, Orchestrator};
    use fabnet::process::DryRunRunner;

    fn up(runner: &FakeRunner, local: bool) -> color_eyre::Result<()> {
        let ws = Workspace::new();
        let deployment = ws.deployment(local);
        Orchestrator::new(&deployment, runner).execute(Action::Up)
    }

    #[test]
    fn test_up_command_sequence() {
        let runner = FakeRunner::new("/nonexistent".into()).leader_after(2);
        up(&runner, false).unwrap();
        let lines = runner.lines();

        let compose_ups: Vec<&String> = lines.iter().filter(|l| l.contains("docker-compose")).collect();
        assert_eq!(compose_ups.len(), 4);
        assert!(compose_ups[0].contains("org1/peer.yaml up -d"));
        assert!(compose_ups[1].contains("org1/orderer.yaml up -d"));
        assert!(compose_ups[2].contains("org2/peer.yaml up -d"));
        assert!(compose_ups.iter().all(|l| l.starts_with("COMPOSE_PROJECT_NAME=fabnet ")));

        // Polled until the marker appeared on the third read
        let logs = lines.iter().filter(|l| *l == "docker logs orderer0.example.com").count();
        assert_eq!(logs, 3);

        let last_up = runner.position("org2/orderer.yaml").unwrap();
        let first_install = runner.position("peer chaincode install").unwrap();
        let create = runner.position("peer channel create").unwrap();
        let update = runner.position("peer channel update").unwrap();
        let instantiate = runner.position("peer chaincode instantiate").unwrap();
        assert!(last_up < first_install);
        assert!(first_install < create && create < update && update < instantiate);

        let installs: Vec<&String> = lines.iter().filter(|l| l.contains("chaincode install")).collect();
        assert_eq!(installs.len(), 2);
        assert!(installs[0].contains("-e CORE_PEER_ADDRESS=peer0.org1.example.com:7051 cli.org1.example.com"));
        assert!(installs[1].contains("cli.org2.example.com"));
        assert!(installs[0].ends_with("-n iotcc -v 1.0 -p iotcc -l golang"));

        let joins: Vec<&String> = lines.iter().filter(|l| l.contains("peer channel join")).collect();
        assert_eq!(joins.len(), 2);
        assert!(joins[0].contains("cli.org1.example.com"));
        assert!(joins[1].contains("cli.org2.example.com"));
        assert!(runner.position("cli.org2.example.com peer channel join").unwrap() > instantiate);

        assert!(lines[create].contains("cli.org1.example.com"));
        assert!(lines[update].contains("/etc/hyperledger/artifacts/channel/org1MSPanchors-common.tx"));
        assert!(lines.iter().any(|l| l == "docker exec cli.org1.example.com chown -R 1000:1000 ."));
    }

    #[test]
    fn test_instantiate_uses_policy_over_all_orgs() {
        let runner = FakeRunner::new("/nonexistent".into());
        up(&runner, false).unwrap();

        let commands = runner.commands();
        let instantiate = commands
            .iter()
            .find(|c| c.has_arg("instantiate"))
            .unwrap();
        assert_eq!(instantiate.arg_after("-P"), Some(r#"OR("org1MSP.peer", "org2MSP.peer")"#));
        assert_eq!(instantiate.arg_after("-c"), Some(r#"{"Args":[]}"#));
        assert_eq!(instantiate.arg_after("-C"), Some("common"));
        assert_eq!(instantiate.arg_after("-o"), Some("orderer0.example.com:7050"));
    }

    #[test]
    fn test_explorer_started_only_for_explorer_orgs() {
        let runner = FakeRunner::new("/nonexistent".into());
        up(&runner, false).unwrap();
        let lines = runner.lines();

        assert!(lines
            .iter()
            .any(|l| l == "docker exec explorer-db.org2.example.com /bin/bash /opt/createdb.sh"));
        assert!(lines.iter().any(|l| l == "docker exec explorer-db.org2.example.com pg_isready"));
        // The database must accept connections before it is initialised
        let ready = runner.position("pg_isready").unwrap();
        let createdb = runner.position("/opt/createdb.sh").unwrap();
        assert!(ready < createdb);
        assert!(lines.iter().any(|l| l == "docker restart explorer.org2.example.com"));
        assert!(!lines.iter().any(|l| l.contains("explorer.org1")));

        let cron = runner
            .commands()
            .into_iter()
            .find(|c| c.program == "sudo")
            .unwrap();
        assert_eq!(cron.args, vec!["tee", "/etc/cron.d/explorer-org2"]);
        let entry = cron.stdin.unwrap();
        assert!(entry.starts_with("0 */3 * * * root docker rm -f explorer.org2.example.com;"));
        assert!(entry.contains("up -d explorer.org2.example.com"));
    }

    #[test]
    fn test_local_adds_overlay() {
        let runner = FakeRunner::new("/nonexistent".into());
        up(&runner, true).unwrap();
        let lines = runner.lines();
        let peer_up = lines.iter().find(|l| l.contains("org1/peer.yaml")).unwrap();
        assert!(peer_up.contains("-f") && peer_up.contains("org1/local-peer.yaml up -d"));
    }

    #[test]
    fn test_leader_timeout_stops_before_channel_setup() {
        let runner = FakeRunner::new("/nonexistent".into()).leader_after(usize::MAX);
        let err = up(&runner, false).unwrap_err();

        assert!(format!("{:?}", err).contains("leader election on orderer0.example.com"));
        assert!(runner.position("peer chaincode install").is_none());
    }

    #[test]
    fn test_failed_channel_create_aborts() {
        let runner = FakeRunner::new("/nonexistent".into()).failing_on("peer channel create");
        up(&runner, false).unwrap_err();

        assert!(runner.position("peer channel join").is_none());
        assert!(runner.position("chaincode instantiate").is_none());
    }

    #[test]
    fn test_dry_run_skips_waits() {
        let ws = Workspace::new();
        let deployment = ws.deployment(false);
        Orchestrator::new(&deployment, &DryRunRunner)
            .execute(Action::Up)
            .unwrap();
    }
}
