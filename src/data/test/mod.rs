mod xp;
