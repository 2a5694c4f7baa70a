use proptest::prelude::*;

use study_core::date::StudyDate;
use study_core::scheduler::{CANONICAL_INTERVALS, Difficulty, HARD_OFFSET_DAYS, Scheduler, Stage};
use study_core::streak::{StreakState, StreakTransition, advance_streak};

fn any_day() -> impl Strategy<Value = StudyDate> {
    // 2000-01-01 plus up to ~80 years
    (0u32..30_000).prop_map(|offset| {
        StudyDate::from_ymd(2000, 1, 1)
            .and_then(|d| d.add_days(offset))
            .unwrap()
    })
}

fn any_difficulty() -> impl Strategy<Value = Difficulty> {
    prop_oneof![Just(Difficulty::Easy), Just(Difficulty::Hard)]
}

proptest! {
    #[test]
    fn next_review_is_always_in_the_future(stage in 0u32..1_000, difficulty in any_difficulty(), today in any_day()) {
        let schedule = Scheduler::new().schedule(Stage::new(stage), difficulty, today).unwrap();
        prop_assert!(schedule.next_review > today);
        prop_assert_eq!(today.days_until(schedule.next_review), i64::from(schedule.offset_days));
    }

    #[test]
    fn hard_always_resets(stage in 0u32..1_000, today in any_day()) {
        let schedule = Scheduler::new().schedule(Stage::new(stage), Difficulty::Hard, today).unwrap();
        prop_assert_eq!(schedule.stage, Stage::INITIAL);
        prop_assert_eq!(schedule.offset_days, HARD_OFFSET_DAYS);
    }

    #[test]
    fn easy_advances_one_stage_with_bounded_offset(stage in 0u32..1_000, today in any_day()) {
        let schedule = Scheduler::new().schedule(Stage::new(stage), Difficulty::Easy, today).unwrap();
        prop_assert_eq!(schedule.stage.value(), stage + 1);
        prop_assert!(CANONICAL_INTERVALS.contains(&schedule.offset_days));
        if stage >= 3 {
            prop_assert_eq!(schedule.offset_days, 30);
        }
    }

    #[test]
    fn easy_offsets_never_shrink(stage in 0u32..100, today in any_day()) {
        let scheduler = Scheduler::new();
        let here = scheduler.schedule(Stage::new(stage), Difficulty::Easy, today).unwrap();
        let next = scheduler.schedule(Stage::new(stage + 1), Difficulty::Easy, today).unwrap();
        prop_assert!(next.offset_days >= here.offset_days);
    }

    #[test]
    fn same_day_visits_are_idempotent(streak in 1u32..10_000, day in any_day()) {
        let state = StreakState { streak, last_visit: day };
        let update = advance_streak(Some(&state), day);
        prop_assert_eq!(update.transition, StreakTransition::Unchanged);
        prop_assert_eq!(update.streak, streak);
        prop_assert!(!update.needs_write());
    }

    #[test]
    fn streak_is_never_zero(streak in 1u32..10_000, last in any_day(), gap in 0u32..400) {
        let state = StreakState { streak, last_visit: last };
        let today = last.add_days(gap).unwrap();
        let update = advance_streak(Some(&state), today);
        prop_assert!(update.streak >= 1);
        match gap {
            0 => prop_assert_eq!(update.streak, streak),
            1 => prop_assert_eq!(update.streak, streak + 1),
            _ => prop_assert_eq!(update.streak, 1),
        }
    }
}
