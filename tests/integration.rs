use std::sync::Arc;

use ipcatd::db::{Catalog, Metadata};
use ipcatd::ip::{RangeError, TableBuilder};
use ipcatd::sync::importer;

mod common {
    use super::*;

    pub struct TestContext {
        pub catalog: Arc<Catalog>,
    }

    impl TestContext {
        pub fn new() -> Self {
            Self {
                catalog: Catalog::new(),
            }
        }

        pub fn import(&self, csv: &str) {
            let records = importer::parse_csv(csv).expect("failed to parse CSV");
            let table = importer::build_table(&records).expect("failed to build table");
            let meta = Metadata {
                record_count: table.len() as u64,
                ..Default::default()
            };
            self.catalog.install(table, meta);
        }
    }

    pub const SCENARIO_CSV: &str = "\
1.0.0.0,1.0.0.255,A,http://a.example/
1.0.4.0,1.0.4.255,B,http://b.example/
8.8.8.0,8.8.8.255,C,http://c.example/
";
}

use common::{TestContext, SCENARIO_CSV};

mod lookup_tests {
    use super::*;

    #[test]
    fn scenario_hits_and_miss() {
        let ctx = TestContext::new();
        ctx.import(SCENARIO_CSV);

        let result = ipcatd::ip::lookup_ip(&ctx.catalog, "1.0.0.5").unwrap();
        assert!(result.found);
        let range = result.range.unwrap();
        assert_eq!(range.name, "A");
        assert_eq!(range.url, "http://a.example/");

        let result = ipcatd::ip::lookup_ip(&ctx.catalog, "1.0.2.5").unwrap();
        assert!(!result.found, "gap between ranges must miss");

        let result = ipcatd::ip::lookup_ip(&ctx.catalog, "8.8.8.8").unwrap();
        assert_eq!(result.range.unwrap().name, "C");
    }

    #[test]
    fn boundaries_are_inclusive() {
        let ctx = TestContext::new();
        ctx.import("10.0.0.0,10.0.0.255,X,\n");

        for ip in ["10.0.0.0", "10.0.0.255"] {
            let result = ipcatd::ip::lookup_ip(&ctx.catalog, ip).unwrap();
            assert!(result.found, "boundary {ip} must be inside the range");
            assert_eq!(result.range.unwrap().name, "X");
        }
    }

    #[test]
    fn empty_catalog_always_misses() {
        let ctx = TestContext::new();

        for ip in ["1.2.3.4", "0.0.0.0", "255.255.255.255", "2001:db8::1"] {
            let result = ipcatd::ip::lookup_ip(&ctx.catalog, ip).unwrap();
            assert!(!result.found);
        }
    }

    #[test]
    fn lookup_after_reimport_sees_new_table() {
        let ctx = TestContext::new();
        ctx.import(SCENARIO_CSV);
        assert!(ipcatd::ip::lookup_ip(&ctx.catalog, "8.8.8.8").unwrap().found);

        ctx.import("9.9.9.0,9.9.9.255,Quad9,\n");
        assert!(!ipcatd::ip::lookup_ip(&ctx.catalog, "8.8.8.8").unwrap().found);
        assert!(ipcatd::ip::lookup_ip(&ctx.catalog, "9.9.9.9").unwrap().found);
    }
}

mod batch_tests {
    use super::*;

    #[test]
    fn batch_lookup_mixed() {
        let ctx = TestContext::new();
        ctx.import(SCENARIO_CSV);

        let ips = ["1.0.0.5", "1.0.4.200", "203.0.113.1", "8.8.8.8"];
        let results = ipcatd::ip::lookup_ips_batch(&ctx.catalog, &ips).unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].range.as_ref().unwrap().name, "A");
        assert_eq!(results[1].range.as_ref().unwrap().name, "B");
        assert!(!results[2].found);
        assert_eq!(results[3].range.as_ref().unwrap().name, "C");
    }

    #[test]
    fn empty_batch() {
        let ctx = TestContext::new();
        let results = ipcatd::ip::lookup_ips_batch(&ctx.catalog, &[]).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn batch_with_invalid_entry_fails() {
        let ctx = TestContext::new();
        ctx.import(SCENARIO_CSV);

        let result = ipcatd::ip::lookup_ips_batch(&ctx.catalog, &["1.0.0.5", "invalid"]);
        assert!(result.is_err(), "batch should fail on invalid IP");
    }
}

mod error_tests {
    use super::*;

    #[test]
    fn malformed_lookup_is_an_error_not_a_miss() {
        let ctx = TestContext::new();
        ctx.import(SCENARIO_CSV);

        for bad in [
            "not-an-ip",
            "999.999.999.999",
            "256.256.256.256",
            "",
            "192.168.1",
            "192.168.1.1.1",
        ] {
            assert!(
                ipcatd::ip::lookup_ip(&ctx.catalog, bad).is_err(),
                "{bad:?} must be rejected"
            );
        }
    }

    #[test]
    fn malformed_record_aborts_import() {
        let records = importer::parse_csv("not-an-ip,1.0.0.255,A,\n").unwrap();
        let err = importer::build_table(&records).unwrap_err();
        assert!(matches!(err, RangeError::MalformedAddress(_)));
    }

    #[test]
    fn short_csv_record_reports_line_number() {
        let err = importer::parse_csv("1.0.0.0,1.0.0.255,A,\nbroken-line\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}

mod ipv6_tests {
    use super::*;

    #[test]
    fn ipv6_ranges_coexist_with_ipv4() {
        let ctx = TestContext::new();
        ctx.import(
            "1.0.0.0,1.0.0.255,Four,\n\
             2001:db8::,2001:db8::ffff,Six,\n",
        );

        let result = ipcatd::ip::lookup_ip(&ctx.catalog, "2001:db8::42").unwrap();
        assert_eq!(result.range.unwrap().name, "Six");

        let result = ipcatd::ip::lookup_ip(&ctx.catalog, "1.0.0.42").unwrap();
        assert_eq!(result.range.unwrap().name, "Four");

        let result = ipcatd::ip::lookup_ip(&ctx.catalog, "2001:db9::1").unwrap();
        assert!(!result.found);
    }

    #[test]
    fn ipv6_compressed_and_full_forms_agree() {
        let ctx = TestContext::new();
        ctx.import("2001:db8::,2001:db8::ffff,Six,\n");

        let result = ipcatd::ip::lookup_ip(
            &ctx.catalog,
            "2001:0db8:0000:0000:0000:0000:0000:0001",
        )
        .unwrap();
        assert!(result.found);
    }
}

mod builder_tests {
    use super::*;

    #[test]
    fn unordered_source_is_sorted_by_builder() {
        let mut builder = TableBuilder::new();
        builder.add_range("8.8.8.0", "8.8.8.255", "C", "").unwrap();
        builder.add_range("1.0.0.0", "1.0.0.255", "A", "").unwrap();
        let table = builder.build().unwrap();

        assert_eq!(table.find("1.0.0.1").unwrap().unwrap().name, "A");
        assert_eq!(table.find("8.8.8.1").unwrap().unwrap().name, "C");
    }

    #[test]
    fn overlapping_source_is_rejected() {
        let mut builder = TableBuilder::new();
        builder.add_range("10.0.0.0", "10.0.1.0", "X", "").unwrap();
        builder.add_range("10.0.0.255", "10.0.2.0", "Y", "").unwrap();
        assert!(matches!(
            builder.build(),
            Err(RangeError::OverlappingRanges(_, _))
        ));
    }

    #[test]
    fn backwards_range_is_rejected() {
        let mut builder = TableBuilder::new();
        let err = builder
            .add_range("10.1.0.0", "10.0.0.0", "X", "")
            .unwrap_err();
        assert!(matches!(err, RangeError::ReversedRange(_, _)));
    }

    #[test]
    fn adjacent_same_provider_ranges_coalesce() {
        let mut builder = TableBuilder::new();
        builder.add_cidr("10.0.0.0/24", "X", "").unwrap();
        builder.add_cidr("10.0.1.0/24", "X", "").unwrap();
        let table = builder.build().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().size(), 512);
    }
}

mod provider_tests {
    use super::*;
    use ipcatd::sync::providers;

    const AWS_BODY: &str = r#"
    {
        "syncToken": "0123456789",
        "createDate": "2016-11-30-23-19-08",
        "prefixes": [
            { "ip_prefix": "216.182.224.0/20", "region": "us-east-1", "service": "AMAZON" },
            { "ip_prefix": "13.54.0.0/15", "region": "ap-southeast-2", "service": "EC2" }
        ]
    }"#;

    #[test]
    fn aws_update_only_adds_ec2() {
        let mut builder = TableBuilder::new();
        providers::apply_aws(&mut builder, AWS_BODY).unwrap();
        let table = builder.build().unwrap();

        assert!(table.find("216.182.224.0").unwrap().is_none());
        let hit = table.find("13.54.0.1").unwrap().unwrap();
        assert_eq!(hit.name, providers::AWS_NAME);
    }

    #[test]
    fn provider_update_replaces_only_its_own_records() {
        let csv = "198.51.100.0,198.51.100.255,Amazon AWS,http://www.amazon.com/aws/\n\
                   203.0.113.0,203.0.113.255,Other DC,\n";
        let records = importer::parse_csv(csv).unwrap();
        let mut builder = TableBuilder::new();
        for record in &records {
            builder.add_record(record).unwrap();
        }

        providers::apply_aws(&mut builder, AWS_BODY).unwrap();
        let table = builder.build().unwrap();

        assert!(table.find("198.51.100.7").unwrap().is_none());
        assert_eq!(table.find("203.0.113.7").unwrap().unwrap().name, "Other DC");
        assert!(table.find("13.54.0.1").unwrap().is_some());
    }

    #[test]
    fn tor_list_parses_singles_and_ranges() {
        let mut builder = TableBuilder::new();
        providers::apply_tor(
            &mut builder,
            "# comment\n198.51.100.7\n203.0.113.0-203.0.113.31\n",
        )
        .unwrap();
        let table = builder.build().unwrap();

        assert_eq!(
            table.find("198.51.100.7").unwrap().unwrap().name,
            providers::TOR_NAME
        );
        assert!(table.find("203.0.113.16").unwrap().is_some());
        assert!(table.find("203.0.113.32").unwrap().is_none());
    }
}

mod export_tests {
    use super::*;

    #[test]
    fn export_round_trips_the_scenario() {
        let records = importer::parse_csv(SCENARIO_CSV).unwrap();
        let table = importer::build_table(&records).unwrap();

        let mut out = Vec::new();
        importer::export_csv(&table, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), SCENARIO_CSV);
    }

    #[test]
    fn stats_rank_providers_by_size() {
        let mut builder = TableBuilder::new();
        builder.add_cidr("10.0.0.0/8", "big", "").unwrap();
        builder.add_cidr("192.168.0.0/24", "tiny", "").unwrap();
        let table = builder.build().unwrap();

        let mut out = Vec::new();
        importer::export_stats(&table, &mut out).unwrap();
        let stats = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = stats.lines().collect();
        assert_eq!(lines[0], "Datacenter Name,Total IPs");
        assert_eq!(lines[1], "big,16777216");
        assert_eq!(lines[2], "tiny,256");
    }
}

mod filesystem_tests {
    use super::*;
    use ipcatd::config::Config;
    use ipcatd::sync::downloader::compute_hash;

    #[tokio::test]
    async fn full_import_then_rebuild_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };

        let catalog = Catalog::new();
        let hash = compute_hash(SCENARIO_CSV);
        importer::full_import(&catalog, SCENARIO_CSV, &hash, &config)
            .await
            .unwrap();

        let rebuilt = Catalog::new();
        importer::rebuild_from_csv(&rebuilt, &config).await.unwrap();

        assert_eq!(rebuilt.record_count(), 3);
        assert_eq!(rebuilt.metadata().csv_hash.as_deref(), Some(hash.as_str()));
        let result = ipcatd::ip::lookup_ip(&rebuilt, "1.0.4.7").unwrap();
        assert_eq!(result.range.unwrap().name, "B");
    }
}

mod concurrency_tests {
    use super::*;
    use std::thread;

    #[test]
    fn concurrent_reads_share_one_snapshot() {
        let ctx = TestContext::new();
        ctx.import(SCENARIO_CSV);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let catalog = Arc::clone(&ctx.catalog);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let result = ipcatd::ip::lookup_ip(&catalog, "1.0.0.5").unwrap();
                        assert!(result.found);

                        let result = ipcatd::ip::lookup_ip(&catalog, "203.0.113.1").unwrap();
                        assert!(!result.found);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread panicked");
        }
    }

    #[test]
    fn reads_survive_concurrent_reimports() {
        let ctx = TestContext::new();
        ctx.import(SCENARIO_CSV);

        let writer = {
            let catalog = Arc::clone(&ctx.catalog);
            thread::spawn(move || {
                for _ in 0..50 {
                    let records = importer::parse_csv(SCENARIO_CSV).unwrap();
                    let table = importer::build_table(&records).unwrap();
                    let meta = Metadata {
                        record_count: table.len() as u64,
                        ..Default::default()
                    };
                    catalog.install(table, meta);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let catalog = Arc::clone(&ctx.catalog);
                thread::spawn(move || {
                    for _ in 0..200 {
                        // every snapshot is fully built; a lookup never
                        // observes a half-installed table
                        let result = ipcatd::ip::lookup_ip(&catalog, "8.8.8.8").unwrap();
                        assert!(result.found);
                    }
                })
            })
            .collect();

        writer.join().expect("writer panicked");
        for handle in readers {
            handle.join().expect("reader panicked");
        }
    }
}
