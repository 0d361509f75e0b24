// 结算日期计算
// 每月15日与30日为结算日 (仅展示用)

use chrono::{Datelike, NaiveDate};

/// 下一个结算日
///
/// 当天不晚于15日 -> 本月15日; 不晚于30日 -> 本月30日 (不足30天的月份取月末);
/// 31日 -> 下月15日
pub fn next_settlement_date(today: NaiveDate) -> NaiveDate {
    let (year, month) = (today.year(), today.month());

    if today.day() <= 15 {
        return NaiveDate::from_ymd_opt(year, month, 15).unwrap_or(today);
    }

    if today.day() <= 30 {
        return NaiveDate::from_ymd_opt(year, month, 30).unwrap_or_else(|| last_day_of_month(today));
    }

    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 15).unwrap_or(today)
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = (date.year(), date.month());
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

/// 当月第一天
pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
