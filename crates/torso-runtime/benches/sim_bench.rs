use criterion::{criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use torso_core::{Ledger, Paygrade, Person, PersonId, Policy, Position, PositionId, Rating, SimConfig, Status};

fn fleet(per_rating: usize) -> Ledger {
    let mut positions = Vec::new();
    let mut people = Vec::new();
    for (r, code) in ["HM", "MA", "MM", "YN", "OS"].iter().enumerate() {
        let rating = Rating::parse(code).unwrap();
        for k in 0..per_rating {
            let level = 3 + (k % 5) as u8;
            let id = PositionId(format!("B{r}{k:06}"));
            let n = (r * per_rating + k) as u64 + 1;
            let mut p = Person::new(
                PersonId(n),
                rating.clone(),
                Paygrade::new(level).unwrap(),
                Decimal::new(250 + (n as i64 * 37) % 250, 2),
            );
            p.time_in_service = 24 + (n as u32 * 13) % 200;
            p.time_in_grade = p.time_in_service.min(12);
            if k % 5 != 0 {
                p.status = Status::Assigned;
                p.position = Some(id.clone());
                p.tour_ticks = (n as u32 * 7) % 30;
            }
            positions.push(Position::new(id, rating.clone(), Paygrade::new(level).unwrap(), "N00001"));
            people.push(p);
        }
    }
    Ledger::new(positions, people).unwrap()
}

fn bench_ticks(c: &mut Criterion) {
    let mut clock = torso_runtime::Clock::new(fleet(2_000), Policy::default(), SimConfig::new(1, 42)).unwrap();
    c.bench_function("sim_tick", |b| {
        b.iter(|| {
            let _ = clock.step();
        })
    });
    c.bench_function("run_12_ticks", |b| {
        b.iter(|| torso_runtime::run(fleet(500), &Policy::default(), 12, 7))
    });
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);
