//! Bootstrap DDL for an empty course-delivery store.
//!
//! Production stores are provisioned elsewhere; this schema covers the
//! tables the rollover, archive and reconciliation passes read or write so a
//! fresh file (or an archive target) can be initialized locally. Dates are
//! ISO `YYYY-MM-DD` text and times of day are minutes after midnight.

pub(crate) const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS term (
  term TEXT NOT NULL,
  term_yr INTEGER NOT NULL,
  start_dt TEXT NOT NULL,
  end_dt TEXT NOT NULL,
  academic_yr TEXT,
  active TEXT,
  active_index INTEGER,
  i_deadline_dt TEXT,
  drop_dt TEXT,
  w_drop_dt TEXT,
  ctrl_enforce TEXT,
  PRIMARY KEY (term, term_yr)
);

CREATE TABLE IF NOT EXISTS student (
  stu_id TEXT PRIMARY KEY,
  pidm INTEGER,
  last_name TEXT,
  first_name TEXT,
  pref_name TEXT,
  middle_initial TEXT,
  apln_term TEXT,
  class TEXT,
  college TEXT,
  dept TEXT,
  program_code TEXT,
  minor TEXT,
  est_graduation TEXT,
  tr_credits TEXT,
  hs_code TEXT,
  hs_gpa TEXT,
  hs_class_rank INTEGER,
  hs_size_class INTEGER,
  act_score INTEGER,
  sat_score INTEGER,
  ap_score INTEGER,
  resident TEXT,
  birthdate TEXT,
  ethnicity TEXT,
  gender TEXT,
  discip_history TEXT,
  discip_status TEXT,
  sev_admin_hold TEXT,
  timelimit_factor REAL,
  licensed TEXT,
  campus TEXT,
  stu_email TEXT,
  adviser_email TEXT,
  password TEXT,
  admit_type TEXT,
  order_enforce TEXT,
  pacing_structure TEXT,
  create_dt TEXT
);

CREATE TABLE IF NOT EXISTS stcourse (
  stu_id TEXT,
  course TEXT,
  sect TEXT,
  term TEXT,
  term_yr INTEGER,
  pace_order INTEGER,
  open_status TEXT,
  grading_option TEXT,
  completed TEXT,
  score INTEGER,
  course_grade TEXT,
  prereq_satis TEXT,
  init_class_roll TEXT,
  stu_provided TEXT,
  final_class_roll TEXT,
  exam_placed TEXT,
  zero_unit INTEGER,
  timeout_factor REAL,
  forfeit_i TEXT,
  i_in_progress TEXT,
  i_counted TEXT,
  ctrl_test TEXT,
  deferred_f_dt TEXT,
  bypass_timeout INTEGER,
  instrn_type TEXT,
  registration_status TEXT,
  last_class_roll_dt TEXT,
  i_term TEXT,
  i_term_yr INTEGER,
  i_deadline_dt TEXT
);

CREATE TABLE IF NOT EXISTS stexam (
  serial_nbr INTEGER,
  version TEXT,
  stu_id TEXT,
  exam_dt TEXT,
  exam_score INTEGER,
  mastery_score INTEGER,
  start_time INTEGER,
  finish_time INTEGER,
  time_ok TEXT,
  passed TEXT,
  seq_nbr INTEGER,
  course TEXT,
  unit INTEGER,
  exam_type TEXT,
  is_first_passed TEXT,
  exam_source TEXT,
  calc_nbr TEXT
);

CREATE TABLE IF NOT EXISTS stqa (
  serial_nbr INTEGER,
  question_nbr INTEGER,
  answer_nbr INTEGER,
  objective TEXT,
  stu_answer TEXT,
  stu_id TEXT,
  version TEXT,
  ans_correct TEXT,
  exam_dt TEXT,
  subtest TEXT,
  finish_time INTEGER
);

CREATE TABLE IF NOT EXISTS sthomework (
  serial_nbr INTEGER,
  version TEXT,
  stu_id TEXT,
  hw_dt TEXT,
  hw_score INTEGER,
  start_time INTEGER,
  finish_time INTEGER,
  time_ok TEXT,
  passed TEXT,
  hw_type TEXT,
  course TEXT,
  sect TEXT,
  unit INTEGER,
  objective TEXT,
  hw_coupon TEXT,
  used_dt TEXT,
  used_serial_nbr INTEGER
);

CREATE TABLE IF NOT EXISTS sthwqa (
  serial_nbr INTEGER,
  question_nbr INTEGER,
  answer_nbr INTEGER,
  objective TEXT,
  stu_answer TEXT,
  stu_id TEXT,
  version TEXT,
  ans_correct TEXT,
  hw_dt TEXT,
  finish_time INTEGER
);

CREATE TABLE IF NOT EXISTS stmpe (
  stu_id TEXT,
  version TEXT,
  academic_yr TEXT,
  exam_dt TEXT,
  start_time INTEGER,
  finish_time INTEGER,
  last_name TEXT,
  first_name TEXT,
  middle_initial TEXT,
  seq_nbr INTEGER,
  serial_nbr INTEGER,
  sts_a INTEGER,
  sts_117 INTEGER,
  sts_118 INTEGER,
  sts_124 INTEGER,
  sts_125 INTEGER,
  sts_126 INTEGER,
  placed TEXT,
  how_validated TEXT
);

CREATE TABLE IF NOT EXISTS stmpeqa (
  stu_id TEXT,
  version TEXT,
  exam_dt TEXT,
  finish_time INTEGER,
  question_nbr INTEGER,
  stu_answer TEXT,
  ans_correct TEXT,
  subtest TEXT,
  tree_ref TEXT
);

CREATE TABLE IF NOT EXISTS stchallenge (
  stu_id TEXT,
  course TEXT,
  version TEXT,
  academic_yr TEXT,
  exam_dt TEXT,
  start_time INTEGER,
  finish_time INTEGER,
  last_name TEXT,
  first_name TEXT,
  middle_initial TEXT,
  seq_nbr INTEGER,
  serial_nbr INTEGER,
  score INTEGER,
  passed TEXT,
  how_validated TEXT
);

CREATE TABLE IF NOT EXISTS stchallengeqa (
  stu_id TEXT,
  course TEXT,
  version TEXT,
  exam_dt TEXT,
  finish_time INTEGER,
  item_id TEXT,
  stu_answer TEXT,
  ans_correct TEXT
);

CREATE TABLE IF NOT EXISTS mpe_credit (
  stu_id TEXT,
  course TEXT,
  exam_placed TEXT,
  exam_dt TEXT,
  dt_cr_refused TEXT,
  serial_nbr INTEGER,
  version TEXT,
  exam_source TEXT
);

CREATE TABLE IF NOT EXISTS mpecr_denied (
  stu_id TEXT,
  course TEXT,
  exam_placed TEXT,
  exam_dt TEXT,
  why_denied TEXT,
  serial_nbr INTEGER,
  version TEXT,
  exam_source TEXT
);

CREATE TABLE IF NOT EXISTS mpe_log (
  stu_id TEXT,
  academic_yr TEXT,
  course TEXT,
  version TEXT,
  start_dt TEXT,
  exam_dt TEXT,
  recover_dt TEXT,
  serial_nbr INTEGER,
  start_time INTEGER,
  calc_nbr TEXT
);

CREATE TABLE IF NOT EXISTS mpscorequeue (
  pidm INTEGER,
  test_code TEXT,
  test_date TEXT,
  test_score TEXT
);

CREATE TABLE IF NOT EXISTS stsurveyqa (
  stu_id TEXT,
  version TEXT,
  exam_dt TEXT,
  survey_nbr INTEGER,
  stu_answer TEXT,
  finish_time INTEGER
);

CREATE TABLE IF NOT EXISTS stmathplan (
  stu_id TEXT,
  pidm INTEGER,
  apln_term TEXT,
  version TEXT,
  exam_dt TEXT,
  survey_nbr INTEGER,
  stu_answer TEXT,
  finish_time INTEGER,
  session INTEGER
);

CREATE TABLE IF NOT EXISTS etext (
  etext_id TEXT PRIMARY KEY,
  retention TEXT,
  purchase_url TEXT,
  refund_period INTEGER,
  key_entry TEXT,
  active TEXT,
  button_label TEXT
);

CREATE TABLE IF NOT EXISTS etext_course (
  etext_id TEXT,
  course TEXT
);

CREATE TABLE IF NOT EXISTS etext_key (
  etext_id TEXT,
  etext_key TEXT,
  active_dt TEXT
);

CREATE TABLE IF NOT EXISTS stetext (
  stu_id TEXT,
  etext_id TEXT,
  active_dt TEXT,
  etext_key TEXT,
  expiration_dt TEXT,
  refund_deadline_dt TEXT,
  refund_dt TEXT,
  refund_reason TEXT
);

CREATE TABLE IF NOT EXISTS admin_hold (
  stu_id TEXT,
  hold_id TEXT,
  sev_admin_hold TEXT,
  times_display INTEGER,
  create_dt TEXT
);

CREATE TABLE IF NOT EXISTS hold_type (
  hold_id TEXT PRIMARY KEY,
  sev_admin_hold TEXT,
  hold_type TEXT,
  add_hold TEXT,
  delete_hold TEXT
);

CREATE TABLE IF NOT EXISTS course (
  course TEXT PRIMARY KEY,
  nbr_units INTEGER,
  course_name TEXT,
  nbr_credits INTEGER,
  calc_ok TEXT,
  course_label TEXT,
  is_tutorial TEXT,
  require_etext TEXT
);

CREATE TABLE IF NOT EXISTS csection (
  course TEXT,
  sect TEXT,
  term TEXT,
  term_yr INTEGER,
  section_id TEXT,
  aries_start_dt TEXT,
  aries_end_dt TEXT,
  start_dt TEXT,
  exam_delete TEXT,
  instrn_type TEXT,
  instructor TEXT,
  campus TEXT,
  pacing_structure TEXT,
  mtg_days TEXT,
  classroom_id TEXT,
  lst_stcrs_creat_dt TEXT,
  grading_std TEXT,
  a_min_score INTEGER,
  b_min_score INTEGER,
  c_min_score INTEGER,
  d_min_score INTEGER,
  survey_sort TEXT,
  course_tu TEXT,
  bogus TEXT
);

CREATE TABLE IF NOT EXISTS next_csection AS SELECT * FROM csection WHERE 0;

CREATE TABLE IF NOT EXISTS crsection (
  course TEXT,
  sect TEXT,
  term TEXT,
  term_yr INTEGER,
  crn TEXT
);

CREATE TABLE IF NOT EXISTS cusection (
  course TEXT,
  sect TEXT,
  unit INTEGER,
  term TEXT,
  term_yr INTEGER,
  timeout INTEGER,
  re_mastery_score INTEGER,
  ue_mastery_score INTEGER,
  hw_mastery_score INTEGER,
  hw_moveon_score INTEGER,
  nbr_atmpts_allow INTEGER,
  atmpts_per_review INTEGER,
  first_test_dt TEXT,
  last_test_dt TEXT,
  begin_test_period INTEGER,
  end_test_period INTEGER,
  coupon_cost INTEGER,
  last_coupon_dt TEXT,
  show_test_window TEXT,
  unproctored_exam TEXT,
  re_points_ontime INTEGER
);

CREATE TABLE IF NOT EXISTS cunit (
  course TEXT,
  unit INTEGER,
  term TEXT,
  term_yr INTEGER,
  unit_exam_wgt REAL,
  cunit_desc TEXT,
  unit_timelimit INTEGER,
  possible_score INTEGER,
  nbr_questions INTEGER,
  unit_type TEXT
);

CREATE TABLE IF NOT EXISTS cuobjective (
  course TEXT,
  unit INTEGER,
  objective TEXT,
  term TEXT,
  term_yr INTEGER,
  lesson_id TEXT,
  lesson_nbr TEXT,
  start_dt TEXT
);

CREATE TABLE IF NOT EXISTS bogus_mapping (
  stu_id TEXT,
  term TEXT,
  term_yr INTEGER,
  bogus_stu_id TEXT
);

CREATE TABLE IF NOT EXISTS dont_submit (
  course TEXT,
  sect TEXT,
  term TEXT,
  term_yr INTEGER
);

CREATE TABLE IF NOT EXISTS milestone (
  term TEXT,
  term_yr INTEGER,
  pace INTEGER,
  pace_track TEXT,
  ms_nbr INTEGER,
  ms_type TEXT,
  ms_date TEXT,
  nbr_atmpts_allow INTEGER
);

CREATE TABLE IF NOT EXISTS next_milestone AS SELECT * FROM milestone WHERE 0;

CREATE TABLE IF NOT EXISTS milestone_appeal (
  stu_id TEXT,
  term TEXT,
  term_yr INTEGER,
  appeal_date_time TEXT,
  appeal_type TEXT,
  pace INTEGER,
  pace_track TEXT,
  ms_nbr INTEGER,
  ms_type TEXT,
  prior_ms_dt TEXT,
  new_ms_dt TEXT,
  attempts_allowed INTEGER,
  circumstances TEXT,
  comment TEXT,
  interviewer TEXT
);

CREATE TABLE IF NOT EXISTS prev_milestone_appeal AS SELECT * FROM milestone_appeal WHERE 0;

CREATE TABLE IF NOT EXISTS pace_appeals (
  stu_id TEXT,
  term TEXT,
  term_yr INTEGER,
  appeal_dt TEXT,
  relief_given TEXT,
  pace INTEGER,
  pace_track TEXT,
  ms_nbr INTEGER,
  ms_type TEXT,
  ms_date TEXT,
  new_deadline_dt TEXT,
  nbr_atmpts_allow INTEGER,
  circumstances TEXT,
  comment TEXT,
  interviewer TEXT
);

CREATE TABLE IF NOT EXISTS pacing_rules (
  term TEXT,
  term_yr INTEGER,
  pacing_structure TEXT,
  activity_type TEXT,
  requirement TEXT
);

CREATE TABLE IF NOT EXISTS pacing_structure (
  term TEXT,
  term_yr INTEGER,
  pacing_structure TEXT,
  def_pace_track TEXT,
  require_licensed TEXT,
  require_partic TEXT,
  max_partic_missed INTEGER,
  allow_inc TEXT,
  max_courses INTEGER,
  nbr_open_allowed INTEGER
);

CREATE TABLE IF NOT EXISTS pace_track_rule (
  term TEXT,
  term_yr INTEGER,
  subterm TEXT,
  pace INTEGER,
  pace_track TEXT,
  criteria TEXT
);

CREATE TABLE IF NOT EXISTS msg (
  term TEXT,
  term_yr INTEGER,
  touch_point TEXT,
  msg_code TEXT,
  subject TEXT,
  template TEXT
);

CREATE TABLE IF NOT EXISTS stmsg (
  stu_id TEXT,
  msg_dt TEXT,
  pace INTEGER,
  course_index INTEGER,
  touch_point TEXT,
  msg_code TEXT,
  sender TEXT
);

CREATE TABLE IF NOT EXISTS msg_lookup (
  domain TEXT,
  code TEXT,
  value TEXT
);

CREATE TABLE IF NOT EXISTS calcs (
  stu_id TEXT,
  issued_nbr TEXT,
  return_nbr TEXT,
  serial_nbr INTEGER,
  exam_dt TEXT
);

CREATE TABLE IF NOT EXISTS challenge_fee (
  stu_id TEXT,
  course TEXT,
  exam_dt TEXT,
  bill_dt TEXT
);

CREATE TABLE IF NOT EXISTS plc_fee (
  stu_id TEXT,
  course TEXT,
  exam_dt TEXT,
  bill_dt TEXT
);

CREATE TABLE IF NOT EXISTS except_stu (
  term TEXT,
  term_yr INTEGER,
  stu_id TEXT,
  course TEXT,
  unit INTEGER,
  course_enroll TEXT,
  hwork_status TEXT,
  sect TEXT,
  sect_enroll TEXT
);

CREATE TABLE IF NOT EXISTS newstu (
  stu_id TEXT,
  acad_lev TEXT,
  reg_status TEXT,
  plan_type TEXT,
  plan TEXT
);

CREATE TABLE IF NOT EXISTS pending_exam (
  serial_nbr INTEGER,
  version TEXT,
  stu_id TEXT,
  exam_dt TEXT,
  exam_score INTEGER,
  start_time INTEGER,
  finish_time INTEGER,
  time_ok TEXT,
  passed TEXT,
  seq_nbr INTEGER,
  course TEXT,
  unit INTEGER,
  exam_type TEXT,
  timelimit_factor REAL,
  stu_type TEXT
);

CREATE TABLE IF NOT EXISTS special_stus (
  stu_id TEXT,
  stu_type TEXT,
  start_dt TEXT,
  end_dt TEXT
);

CREATE TABLE IF NOT EXISTS stc (
  stu_id TEXT,
  course TEXT,
  unit INTEGER,
  seq_nbr INTEGER
);

CREATE TABLE IF NOT EXISTS stmilestone (
  stu_id TEXT,
  term TEXT,
  term_yr INTEGER,
  pace_track TEXT,
  ms_nbr INTEGER,
  ms_type TEXT,
  ms_date TEXT,
  nbr_atmpts_allow INTEGER
);

CREATE TABLE IF NOT EXISTS stterm (
  stu_id TEXT,
  term TEXT,
  term_yr INTEGER,
  pace INTEGER,
  pace_track TEXT,
  first_course TEXT,
  cohort TEXT,
  urgency INTEGER,
  do_not_disturb TEXT
);

CREATE TABLE IF NOT EXISTS stpace_summary (
  stu_id TEXT,
  course TEXT,
  sect TEXT,
  term TEXT,
  term_yr INTEGER,
  i_in_progress TEXT,
  pace INTEGER,
  pace_track TEXT,
  pace_order INTEGER,
  ms_nbr INTEGER,
  ms_unit INTEGER,
  ms_date TEXT,
  new_ms_date TEXT,
  exam_dt TEXT,
  re_points INTEGER
);

CREATE TABLE IF NOT EXISTS stresource (
  stu_id TEXT,
  resource_id TEXT,
  loan_dt TEXT,
  start_time INTEGER,
  due_dt TEXT,
  return_dt TEXT,
  finish_time INTEGER,
  times_display INTEGER,
  create_dt TEXT
);

CREATE TABLE IF NOT EXISTS users (
  stu_id TEXT,
  term TEXT,
  term_yr INTEGER,
  serial_nbr INTEGER,
  version TEXT,
  exam_dt TEXT,
  exam_score INTEGER,
  calc_score TEXT,
  passed TEXT
);

CREATE TABLE IF NOT EXISTS delphi (
  stu_id TEXT,
  term TEXT,
  term_yr INTEGER,
  response TEXT
);

CREATE TABLE IF NOT EXISTS delphi_check (
  stu_id TEXT,
  term TEXT,
  term_yr INTEGER,
  checked_dt TEXT
);

CREATE TABLE IF NOT EXISTS dup_registr (
  stu_id TEXT,
  course TEXT,
  sect TEXT,
  term TEXT,
  term_yr INTEGER
);

CREATE TABLE IF NOT EXISTS fcr_student (
  stu_id TEXT,
  course TEXT,
  sect TEXT,
  term TEXT,
  term_yr INTEGER
);

CREATE TABLE IF NOT EXISTS final_croll (
  stu_id TEXT,
  course TEXT,
  sect TEXT,
  term TEXT,
  term_yr INTEGER,
  grade TEXT
);

CREATE TABLE IF NOT EXISTS ffr_trns (
  stu_id TEXT,
  course TEXT,
  exam_placed TEXT,
  exam_dt TEXT,
  dt_cr_refused TEXT
);

CREATE TABLE IF NOT EXISTS grade_roll (
  stu_id TEXT,
  course TEXT,
  sect TEXT,
  term TEXT,
  term_yr INTEGER,
  fullname TEXT,
  grade_opt TEXT
);

CREATE TABLE IF NOT EXISTS prev_extensions (
  stu_id TEXT,
  term TEXT,
  term_yr INTEGER,
  course TEXT,
  unit INTEGER,
  extension_days INTEGER
);

CREATE TABLE IF NOT EXISTS prev_stlmiss (
  stu_id TEXT,
  term TEXT,
  term_yr INTEGER,
  pace_track TEXT,
  ms_nbr INTEGER,
  ms_type TEXT,
  missed_dt TEXT
);

CREATE TABLE IF NOT EXISTS prev_stmilestone AS SELECT * FROM stmilestone WHERE 0;

CREATE TABLE IF NOT EXISTS prev_stterm AS SELECT * FROM stterm WHERE 0;

CREATE TABLE IF NOT EXISTS prev_stlock (
  stu_id TEXT,
  term TEXT,
  term_yr INTEGER,
  lock_type TEXT,
  lock_dt TEXT
);

CREATE TABLE IF NOT EXISTS remote_mpe (
  term TEXT,
  term_yr INTEGER,
  apln_term TEXT,
  course TEXT,
  start_dt TEXT,
  end_dt TEXT
);

CREATE TABLE IF NOT EXISTS next_remote_mpe AS SELECT * FROM remote_mpe WHERE 0;

CREATE TABLE IF NOT EXISTS discipline (
  stu_id TEXT,
  dt_incident TEXT,
  incident_type TEXT,
  course TEXT,
  unit INTEGER,
  cheat_desc TEXT,
  action_type TEXT,
  action_comment TEXT
);

CREATE TABLE IF NOT EXISTS mdstudent (
  stu_id TEXT,
  create_dt TEXT,
  mdprog TEXT
);

CREATE TABLE IF NOT EXISTS stmdscores (
  stu_id TEXT,
  series_nbr INTEGER,
  unit INTEGER,
  objective TEXT,
  score INTEGER
);

CREATE TABLE IF NOT EXISTS stcunit (
  stu_id TEXT,
  course TEXT,
  unit INTEGER,
  review_status TEXT,
  review_score INTEGER,
  review_points INTEGER,
  proctored_status TEXT,
  proctored_score INTEGER,
  proctored_points INTEGER
);

CREATE TABLE IF NOT EXISTS stcuobjective (
  stu_id TEXT,
  course TEXT,
  unit INTEGER,
  objective TEXT,
  lecture_viewed_dt TEXT,
  seed INTEGER,
  last_component_finished INTEGER
);

CREATE TABLE IF NOT EXISTS prereq (
  course TEXT,
  term TEXT,
  term_yr INTEGER,
  prerequisite TEXT
);

CREATE TABLE IF NOT EXISTS surveyqa (
  term TEXT,
  term_yr INTEGER,
  version TEXT,
  survey_nbr INTEGER,
  question_desc TEXT,
  type_question TEXT,
  answer TEXT,
  answer_desc TEXT
);

CREATE TABLE IF NOT EXISTS campus_calendar (
  campus_dt TEXT,
  dt_desc TEXT,
  open_time1 TEXT,
  close_time1 TEXT,
  weekdays_1 TEXT
);

CREATE TABLE IF NOT EXISTS next_campus_calendar AS SELECT * FROM campus_calendar WHERE 0;

CREATE TABLE IF NOT EXISTS semester_calendar (
  term TEXT,
  term_yr INTEGER,
  week_nbr INTEGER,
  start_dt TEXT,
  end_dt TEXT
);

CREATE TABLE IF NOT EXISTS next_semester_calendar AS SELECT * FROM semester_calendar WHERE 0;

CREATE TABLE IF NOT EXISTS client_pc (
  computer_id TEXT,
  testing_center_id TEXT,
  station_nbr TEXT,
  current_status TEXT
);

CREATE TABLE IF NOT EXISTS cohort (
  cohort TEXT,
  size INTEGER,
  instructor TEXT
);

CREATE TABLE IF NOT EXISTS exam (
  version TEXT,
  course TEXT,
  unit INTEGER,
  vsn_explt TEXT,
  title TEXT,
  button_label TEXT,
  ftype TEXT
);

CREATE TABLE IF NOT EXISTS examqa (
  version TEXT,
  problem_nbr INTEGER,
  exam_section_nbr INTEGER,
  question_nbr INTEGER,
  correct_answer TEXT,
  objective TEXT,
  bogus TEXT,
  subtest TEXT
);

CREATE TABLE IF NOT EXISTS grading_std (
  grading_std TEXT,
  only_over_20 TEXT,
  ue_passing_score INTEGER
);

CREATE TABLE IF NOT EXISTS high_schools (
  hs_code TEXT,
  hs_name TEXT,
  addres_1 TEXT,
  city TEXT,
  state TEXT
);

CREATE TABLE IF NOT EXISTS homework (
  version TEXT,
  course TEXT,
  unit INTEGER,
  objective TEXT,
  title TEXT,
  hw_type TEXT,
  active_dt TEXT
);

CREATE TABLE IF NOT EXISTS mpe (
  version TEXT,
  max_online_atmpts INTEGER,
  max_proctored_atmpts INTEGER
);

CREATE TABLE IF NOT EXISTS parameters (
  pgm_name TEXT,
  parm1 TEXT,
  parm2 TEXT,
  parm3 TEXT
);

CREATE TABLE IF NOT EXISTS resource (
  resource_id TEXT,
  resource_type TEXT,
  resource_desc TEXT,
  days_allowed INTEGER,
  holds_allowed INTEGER,
  hold_days_allowed INTEGER
);

CREATE TABLE IF NOT EXISTS testing_centers (
  testing_center_id TEXT,
  tc_name TEXT,
  nbr_seats INTEGER
);

CREATE TABLE IF NOT EXISTS user_clearance (
  login TEXT,
  clear_function TEXT,
  clear_type INTEGER,
  clear_passwd TEXT
);
";

/// Every table `SCHEMA_SQL` creates, in declaration order.
pub const TABLES: &[&str] = &[
    "term",
    "student",
    "stcourse",
    "stexam",
    "stqa",
    "sthomework",
    "sthwqa",
    "stmpe",
    "stmpeqa",
    "stchallenge",
    "stchallengeqa",
    "mpe_credit",
    "mpecr_denied",
    "mpe_log",
    "mpscorequeue",
    "stsurveyqa",
    "stmathplan",
    "etext",
    "etext_course",
    "etext_key",
    "stetext",
    "admin_hold",
    "hold_type",
    "course",
    "csection",
    "next_csection",
    "crsection",
    "cusection",
    "cunit",
    "cuobjective",
    "bogus_mapping",
    "dont_submit",
    "milestone",
    "next_milestone",
    "milestone_appeal",
    "prev_milestone_appeal",
    "pace_appeals",
    "pacing_rules",
    "pacing_structure",
    "pace_track_rule",
    "msg",
    "stmsg",
    "msg_lookup",
    "calcs",
    "challenge_fee",
    "plc_fee",
    "except_stu",
    "newstu",
    "pending_exam",
    "special_stus",
    "stc",
    "stmilestone",
    "stterm",
    "stpace_summary",
    "stresource",
    "users",
    "delphi",
    "delphi_check",
    "dup_registr",
    "fcr_student",
    "final_croll",
    "ffr_trns",
    "grade_roll",
    "prev_extensions",
    "prev_stlmiss",
    "prev_stmilestone",
    "prev_stterm",
    "prev_stlock",
    "remote_mpe",
    "next_remote_mpe",
    "discipline",
    "mdstudent",
    "stmdscores",
    "stcunit",
    "stcuobjective",
    "prereq",
    "surveyqa",
    "campus_calendar",
    "next_campus_calendar",
    "semester_calendar",
    "next_semester_calendar",
    "client_pc",
    "cohort",
    "exam",
    "examqa",
    "grading_std",
    "high_schools",
    "homework",
    "mpe",
    "parameters",
    "resource",
    "testing_centers",
    "user_clearance",
];
