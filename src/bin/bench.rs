//! Benchmark for end-to-end solve latency.
//!
//! Run with: cargo run --release --bin bench

use std::time::Instant;

use shift_scheduling::demo_data::{self, DemoData};
use shift_scheduling::engine;

fn main() {
    println!("Benchmark: solve latency on demo data");
    println!();

    for demo in [DemoData::Small, DemoData::Large] {
        let request = demo_data::generate(demo);
        println!("{}:", demo.as_str());
        println!("  Employees: {}", request.employees.len());
        println!("  Shifts: {}", request.shifts.len());
        println!(
            "  Constraints: {} hard / {} soft",
            request.constraints.hard.len(),
            request.constraints.soft.len()
        );

        let started_at = Instant::now();
        match engine::solve_schedule_request(&request, "bench", started_at) {
            Ok(response) => {
                println!("  Status: {}", response.status);
                println!("  Objective: {:?}", response.objective);
                println!(
                    "  Unsatisfied soft constraints: {}",
                    response.objective_breakdown.unsatisfied_count
                );
            }
            Err(error) => println!("  Rejected: {error}"),
        }
        println!("  Time: {:.2?}", started_at.elapsed());
        println!();
    }
}
